use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use smartshop_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(&config.database_url).await?;

    let password = std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
    let admin_id = ensure_admin(&pool, "admin", &password).await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}");
    Ok(())
}

async fn ensure_admin(pool: &sqlx::PgPool, username: &str, password: &str) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        println!("Admin {username} already exists");
        return Ok(id);
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, password_hash, role)
        VALUES ($1, $2, $3, 'ADMIN')
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    println!("Created admin {username}");
    Ok(id)
}

/// Prices in minor units. Only runs against an empty catalog.
async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM products")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        println!("Products already exist, skipping");
        return Ok(());
    }

    let products: [(&str, &str, i64, i32); 15] = [
        ("Laptop Dell Latitude 5540", "15.6 inch business laptop, Core i7, 16GB RAM, 512GB SSD", 850_000, 25),
        ("MacBook Pro 14 M3", "14 inch, M3 Pro, 18GB RAM, 512GB SSD", 1_500_000, 15),
        ("Dell UltraSharp 27 Monitor", "27 inch 4K USB-C monitor", 420_000, 40),
        ("Logitech MX Keys", "Backlit wireless keyboard", 85_000, 100),
        ("Logitech MX Master 3S", "Ergonomic wireless mouse", 75_000, 80),
        ("Electric Standing Desk", "Height adjustable desk, 160x80cm", 350_000, 20),
        ("Herman Miller Aeron Chair", "Ergonomic office chair with lumbar support", 980_000, 12),
        ("LED Desk Lamp", "Dimmable lamp with adjustable color temperature", 45_000, 60),
        ("A4 Paper Ream (500 sheets)", "80g/m2 white printing paper", 4_500, 500),
        ("HP 963XL Black Ink Cartridge", "High capacity cartridge for OfficeJet Pro", 32_000, 150),
        ("Bic Cristal Pens (50 pack)", "Blue ballpoint pens, medium tip", 8_500, 200),
        ("Cisco 24-Port PoE+ Switch", "Managed gigabit switch, 370W PoE+", 650_000, 10),
        ("Ubiquiti WiFi 6 Access Point", "UniFi U6-Pro, PoE powered", 180_000, 30),
        ("Cat6 Ethernet Cable (100m)", "Shielded Cat6 cable spool", 65_000, 50),
        ("Hikvision 4MP IP Camera", "PoE camera with night vision", 120_000, 45),
    ];

    for (name, desc, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded {} products", products.len());
    Ok(())
}
