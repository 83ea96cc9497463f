use clap::Parser;
use diesel::{Connection, SqliteConnection};
use peerreview::{
    accounts::{Account, create_user},
    state::{configure_connection, run_migrations},
};

/// Seeds a database with an admin account and a handful of employees.
#[derive(Parser)]
pub struct Seed {
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
    /// Number of employees (`user0`, `user1`, ...) to create.
    #[arg(long, default_value_t = 10)]
    employees: usize,
    /// Password given to every seeded account.
    #[arg(long, default_value = "1234")]
    password: String,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Seed::parse();

    let mut conn = SqliteConnection::establish(&args.database_url)?;
    configure_connection(&mut conn)?;
    run_migrations(&mut conn)?;

    let accounts = std::iter::once(("admin".to_string(), true)).chain(
        (0..args.employees).map(|i| (format!("user{i}"), false)),
    );

    for (username, is_admin) in accounts {
        if Account::by_username(&username, &mut conn)?.is_some() {
            println!("Skipped {username} (already exists)");
            continue;
        }
        let account =
            create_user(is_admin, &username, &args.password, "", &mut conn)?;
        println!("Created {}", account.user.username);
    }

    Ok(())
}
