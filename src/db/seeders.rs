//! Idempotent seed data applied on every startup.

use anyhow::Result;
use sqlx::SqlitePool;

/// Default site settings. The settings table is an open key-value map; these
/// are the keys the frontend knows about.
const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("site_name", "PasarKampus"),
    ("site_description", "Jual beli barang antar mahasiswa"),
    ("site_logo", ""),
    ("github_url", ""),
    ("instagram_url", ""),
    ("facebook_url", ""),
];

/// Starter categories so a fresh install has something to file products under.
const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Elektronik", "Laptop, HP, dan gadget lainnya"),
    ("Buku", "Buku kuliah dan bacaan"),
    ("Pakaian", "Pakaian dan aksesoris"),
    ("Lainnya", "Barang-barang lainnya"),
];

pub async fn seed_defaults(pool: &SqlitePool) -> Result<()> {
    for (key, value) in DEFAULT_SETTINGS {
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(pool)
            .await?;
    }

    for (name, description) in DEFAULT_CATEGORIES {
        sqlx::query("INSERT OR IGNORE INTO categories (name, description) VALUES (?, ?)")
            .bind(name)
            .bind(description)
            .execute(pool)
            .await?;
    }

    Ok(())
}
