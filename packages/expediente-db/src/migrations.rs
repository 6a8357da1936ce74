//! Sistema de migrações para banco de dados
//!
//! Este módulo gerencia as migrações do banco de dados SQLite

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{error, info};

/// Lista de migrações SQL a serem aplicadas
pub(crate) const MIGRATIONS: &[&str] = &[
    // 001_initial_schema.sql
    r#"
    -- Usuários de autenticação
    CREATE TABLE IF NOT EXISTS auth_users (
        id BLOB PRIMARY KEY NOT NULL,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL
    );

    -- Perfis de médicos (mesmo id do usuário)
    CREATE TABLE IF NOT EXISTS doctors (
        id BLOB PRIMARY KEY NOT NULL,
        created_at TIMESTAMP NOT NULL,
        email TEXT NOT NULL,
        full_name TEXT NOT NULL,
        specialty TEXT NOT NULL DEFAULT '',
        phone TEXT,
        FOREIGN KEY (id) REFERENCES auth_users (id) ON DELETE CASCADE
    );

    -- Fichas de pacientes
    CREATE TABLE IF NOT EXISTS patients (
        id BLOB PRIMARY KEY NOT NULL,
        doctor_id BLOB NOT NULL,
        full_name TEXT NOT NULL,
        date_of_birth DATE NOT NULL,
        sex TEXT NOT NULL CHECK (sex IN ('M', 'F')),
        phone TEXT NOT NULL DEFAULT '',
        email TEXT NOT NULL DEFAULT '',
        address TEXT NOT NULL DEFAULT '',
        id_number TEXT NOT NULL DEFAULT '',
        civil_status TEXT NOT NULL DEFAULT '',
        nationality TEXT NOT NULL DEFAULT '',
        occupation TEXT NOT NULL DEFAULT '',
        consult_reason TEXT NOT NULL DEFAULT '',
        pathological_history TEXT NOT NULL DEFAULT '',
        family_history TEXT NOT NULL DEFAULT '',
        habits TEXT NOT NULL DEFAULT '',
        current_medications TEXT NOT NULL DEFAULT '',
        allergies TEXT NOT NULL DEFAULT '',
        vital_signs TEXT NOT NULL DEFAULT '{}', -- JSON com os sinais vitais
        physical_exam TEXT NOT NULL DEFAULT '',
        lab_results TEXT NOT NULL DEFAULT '',
        diagnosis TEXT NOT NULL DEFAULT '',
        treatment TEXT NOT NULL DEFAULT '',
        prognosis TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'neutro' CHECK (status IN ('neutro', 'estable', 'seguimiento', 'urgente')),
        created_at TIMESTAMP NOT NULL,
        FOREIGN KEY (doctor_id) REFERENCES doctors (id) ON DELETE CASCADE
    );

    -- Consultas
    CREATE TABLE IF NOT EXISTS visits (
        id BLOB PRIMARY KEY NOT NULL,
        created_at TIMESTAMP NOT NULL,
        patient_id BLOB NOT NULL,
        doctor_id BLOB NOT NULL,
        visit_date TIMESTAMP NOT NULL,
        visit_type TEXT NOT NULL,
        symptoms TEXT NOT NULL,
        diagnosis TEXT NOT NULL,
        treatment_plan TEXT,
        notes TEXT,
        prescription TEXT,
        lab_request TEXT,
        status TEXT NOT NULL,
        FOREIGN KEY (patient_id) REFERENCES patients (id) ON DELETE CASCADE,
        FOREIGN KEY (doctor_id) REFERENCES doctors (id) ON DELETE CASCADE
    );

    -- Índices para otimização
    CREATE INDEX IF NOT EXISTS idx_patients_doctor_id ON patients (doctor_id);
    CREATE INDEX IF NOT EXISTS idx_patients_created_at ON patients (created_at);
    CREATE INDEX IF NOT EXISTS idx_visits_patient_id ON visits (patient_id);
    CREATE INDEX IF NOT EXISTS idx_visits_doctor_id ON visits (doctor_id);
    CREATE INDEX IF NOT EXISTS idx_visits_visit_date ON visits (visit_date);
    "#,

    // 002_auth_recovery_and_storage.sql
    r#"
    -- Solicitações de recuperação de senha
    -- O envio do e-mail com as instruções é externo ao backend
    CREATE TABLE IF NOT EXISTS password_recoveries (
        id BLOB PRIMARY KEY NOT NULL,
        user_id BLOB NOT NULL,
        requested_at TIMESTAMP NOT NULL,
        FOREIGN KEY (user_id) REFERENCES auth_users (id) ON DELETE CASCADE
    );

    -- Buckets do armazenamento de objetos
    CREATE TABLE IF NOT EXISTS storage_buckets (
        name TEXT PRIMARY KEY NOT NULL,
        public BOOLEAN NOT NULL DEFAULT 0,
        file_size_limit INTEGER NOT NULL,
        created_at TIMESTAMP NOT NULL
    );

    -- Metadados dos objetos gravados em disco
    CREATE TABLE IF NOT EXISTS storage_objects (
        bucket TEXT NOT NULL,
        name TEXT NOT NULL,
        content_type TEXT NOT NULL,
        size INTEGER NOT NULL,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        PRIMARY KEY (bucket, name),
        FOREIGN KEY (bucket) REFERENCES storage_buckets (name) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_password_recoveries_user_id ON password_recoveries (user_id);
    "#,
];

/// Executa todas as migrações pendentes no banco de dados
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Aplicando migrações de banco de dados...");

    // Obter a versão atual do banco de dados
    let mut version: i64 = 0;
    match sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
    {
        Ok(v) => version = v,
        Err(e) => {
            error!("Erro ao obter versão do banco: {}", e);
            // Continuar mesmo assim, pois pode ser a primeira execução
        }
    }

    info!("Versão atual do banco: {}", version);

    for (i, migration_sql) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as i64;

        if migration_version <= version {
            info!("Migração {} já aplicada", migration_version);
            continue;
        }

        info!("Aplicando migração {}...", migration_version);

        let mut transaction = pool
            .begin()
            .await
            .context(format!("Falha ao iniciar transação para migração {}", migration_version))?;

        for statement in migration_sql
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            sqlx::query(statement)
                .execute(&mut *transaction)
                .await
                .context(format!("Falha ao executar migração {}", migration_version))?;
        }

        sqlx::query(&format!("PRAGMA user_version = {}", migration_version))
            .execute(&mut *transaction)
            .await
            .context(format!("Falha ao atualizar versão para {}", migration_version))?;

        transaction
            .commit()
            .await
            .context(format!("Falha ao confirmar transação para migração {}", migration_version))?;

        info!("Migração {} aplicada com sucesso", migration_version);
    }

    info!("Migrações concluídas. Versão atual: {}", MIGRATIONS.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqliteConnectOptions;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_migrations() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("test_migrations.db");

        let conn_options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(conn_options).await?;

        run_migrations(&pool).await?;

        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&pool)
            .await?;

        assert_eq!(version, MIGRATIONS.len() as i64);

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&pool)
        .await?;

        assert!(tables.contains(&"auth_users".to_string()));
        assert!(tables.contains(&"doctors".to_string()));
        assert!(tables.contains(&"patients".to_string()));
        assert!(tables.contains(&"visits".to_string()));
        assert!(tables.contains(&"storage_buckets".to_string()));
        assert!(tables.contains(&"storage_objects".to_string()));

        // Reaplicar não altera a versão
        run_migrations(&pool).await?;
        let again: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&pool)
            .await?;
        assert_eq!(again, version);

        Ok(())
    }
}
