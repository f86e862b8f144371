//! Database seeders for initial campaign data.
//!
//! Seeding runs once during process startup and is idempotent against
//! database state, so a restart or a second instance never duplicates rows.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Seed the initial campaign locations when the table is empty.
pub async fn seed_locations_if_empty(pool: &SqlitePool) -> Result<()> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM locations")
        .fetch_one(pool)
        .await?;
    if count.0 > 0 {
        return Ok(());
    }

    // Format: (name, kind, lat, lng, description, sphere, narration)
    let locations: Vec<(&str, &str, f64, f64, &str, &str, &str)> = vec![
        (
            "La Terminal Vieja",
            "power",
            -33.1301,
            -64.3499,
            "Antigua terminal de ómnibus, abandonada. Las paredes vibran con ecos de despedidas nunca dichas.",
            "Entropía/Tiempo",
            "Los relojes se detienen aquí. El pasado sangra en el presente.",
        ),
        (
            "Café del Boulevard",
            "refuge",
            -33.1234,
            -64.3478,
            "Refugio de la Curandera. Veladores rojos, cartas del tarot, y secretos murmurados entre el humo.",
            "Vida/Espíritu",
            "Un lugar fuera del tiempo. Aquí, la paradoja no puede tocarte... por ahora.",
        ),
        (
            "Universidad Nacional RC",
            "mission",
            -33.1189,
            -64.3142,
            "Laboratorios del tecnócrata. Entre computadoras viejas y cables, la magia se codifica en binario.",
            "Fuerzas/Materia",
            "Los tecnócratas vigilan. Cada experimento es un ritual, cada ecuación es un hechizo.",
        ),
        (
            "El Puente Carretero",
            "danger",
            -33.1156,
            -64.3523,
            "Cruce sobre el río. Aquí, entre dos mundos, la paradoja se manifiesta con violencia.",
            "Primordio/Correspondencia",
            "No cruces solo de noche. Las sombras tienen hambre, y la realidad se desgarra.",
        ),
        (
            "Grafiti del Niño Punky",
            "mission",
            -33.1278,
            -64.3556,
            "Un mural en la pared: símbolos caóticos que cambian cada noche. Arte vivo, magia callejera.",
            "Caos/Primordio",
            "Los tags hablan. Si sabes leer entre las líneas, revelan verdades que la razón rechaza.",
        ),
    ];

    let total = locations.len();
    let now = chrono::Utc::now().to_rfc3339();

    for (name, kind, lat, lng, description, sphere, narration) in locations {
        sqlx::query(
            r#"
            INSERT INTO locations
                (id, name, description, narration, sphere, address, lat, lng,
                 kind, visible, images, events, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, '', ?, ?, ?, 1, NULL, NULL, NULL, ?, ?)
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(name)
        .bind(description)
        .bind(narration)
        .bind(sphere)
        .bind(lat)
        .bind(lng)
        .bind(kind)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;
    }

    info!("Seeded {} initial locations", total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_pool, LocationRow};

    #[tokio::test]
    async fn test_seed_locations_is_idempotent() {
        let pool = test_pool().await;

        seed_locations_if_empty(&pool).await.unwrap();
        seed_locations_if_empty(&pool).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM locations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 5);
    }

    #[tokio::test]
    async fn test_seeded_locations_are_visible_and_unowned() {
        let pool = test_pool().await;
        seed_locations_if_empty(&pool).await.unwrap();

        let rows: Vec<LocationRow> = sqlx::query_as("SELECT * FROM locations")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert!(rows.iter().all(|r| r.visible));
        assert!(rows.iter().all(|r| r.created_by.is_none()));
        assert!(rows.iter().all(|r| r.get_events().is_empty()));
    }

    #[tokio::test]
    async fn test_seed_respects_existing_data() {
        let pool = test_pool().await;
        sqlx::query(
            "INSERT INTO locations (id, name, lat, lng, created_at, updated_at) \
             VALUES ('loc1', 'Custom', 0.0, 0.0, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();

        seed_locations_if_empty(&pool).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM locations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }
}
