//! Warehouse side of the load stage: schema creation and bulk COPY over
//! the postgres wire protocol.

use async_trait::async_trait;
use tokio_postgres::NoTls;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::EtlError;

/// Warehouse collaborator: accepts batches of raw SQL statements.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn batch_execute(&self, sql: &str) -> Result<(), EtlError>;
}

/// Redshift-compatible warehouse reached over the postgres protocol.
pub struct RedshiftWarehouse {
    client: tokio_postgres::Client,
}

impl RedshiftWarehouse {
    /// Connect with the parameters from `config`. The connection task is
    /// driven in the background for the lifetime of the client.
    pub async fn connect(config: &Config) -> Result<Self, EtlError> {
        let (client, connection) = tokio_postgres::Config::new()
            .host(&config.warehouse_endpoint)
            .port(config.warehouse_port)
            .dbname(&config.warehouse_db)
            .user(&config.warehouse_user)
            .password(&config.warehouse_password)
            .connect(NoTls)
            .await
            .map_err(|e| {
                EtlError::Load(format!(
                    "connect to {}:{}: {e}",
                    config.warehouse_endpoint, config.warehouse_port
                ))
            })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("warehouse connection error: {e}");
            }
        });

        Ok(Self { client })
    }
}

#[async_trait]
impl SqlExecutor for RedshiftWarehouse {
    async fn batch_execute(&self, sql: &str) -> Result<(), EtlError> {
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| EtlError::Load(e.to_string()))
    }
}

/// DDL for the star schema, dimensions before the fact table so its
/// foreign keys resolve. `IF NOT EXISTS` keeps reruns idempotent; COPY
/// appends to whatever is already loaded.
const CREATE_TABLES_SQL: &str = "
    CREATE TABLE IF NOT EXISTS branches (
        branch_id INTEGER PRIMARY KEY,
        branch VARCHAR(100),
        city VARCHAR(100)
    );

    CREATE TABLE IF NOT EXISTS customer_types (
        customer_id INTEGER PRIMARY KEY,
        customer_type VARCHAR(100)
    );

    CREATE TABLE IF NOT EXISTS genders (
        gender_id INTEGER PRIMARY KEY,
        gender VARCHAR(100)
    );

    CREATE TABLE IF NOT EXISTS product_lines (
        product_line_id INTEGER PRIMARY KEY,
        product_line VARCHAR(100)
    );

    CREATE TABLE IF NOT EXISTS payments (
        payment_id INTEGER PRIMARY KEY,
        payment VARCHAR(100)
    );

    CREATE TABLE IF NOT EXISTS dates (
        date_id INTEGER PRIMARY KEY,
        c_date DATE,
        c_year INTEGER,
        c_month SMALLINT,
        c_day SMALLINT,
        c_weekday SMALLINT
    );

    CREATE TABLE IF NOT EXISTS sales (
        id INTEGER PRIMARY KEY,
        invoice_id VARCHAR(20),
        unit_price DECIMAL(7,2),
        quantity SMALLINT,
        tax_5 REAL,
        total REAL,
        cogs REAL,
        gross_margin_percentage REAL,
        gross_income REAL,
        rating DECIMAL(2,1),
        branch_id INTEGER,
        customer_id INTEGER,
        gender_id INTEGER,
        product_line_id INTEGER,
        payment_id INTEGER,
        date_id INTEGER,
        FOREIGN KEY (branch_id) REFERENCES branches (branch_id),
        FOREIGN KEY (customer_id) REFERENCES customer_types (customer_id),
        FOREIGN KEY (gender_id) REFERENCES genders (gender_id),
        FOREIGN KEY (product_line_id) REFERENCES product_lines (product_line_id),
        FOREIGN KEY (payment_id) REFERENCES payments (payment_id),
        FOREIGN KEY (date_id) REFERENCES dates (date_id)
    );
";

// (table, columns in CSV order, source file) for each bulk copy, in
// dependency order: every dimension loads before the fact table.
const COPY_TARGETS: [(&str, &str, &str); 7] = [
    ("branches", "city, branch, branch_id", "branch.csv"),
    ("customer_types", "customer_type, customer_id", "customer_type.csv"),
    ("genders", "gender, gender_id", "gender.csv"),
    ("product_lines", "product_line, product_line_id", "product_line.csv"),
    ("payments", "payment, payment_id", "payment.csv"),
    (
        "dates",
        "c_date, c_year, c_month, c_day, c_weekday, date_id",
        "dates.csv",
    ),
    (
        "sales",
        "invoice_id, unit_price, quantity, tax_5, total, cogs, \
         gross_margin_percentage, gross_income, rating, branch_id, \
         customer_id, gender_id, product_line_id, payment_id, date_id, id",
        "df_final.csv",
    ),
];

/// Per-table COPY statements. Columns are listed explicitly because the
/// CSV contract puts the surrogate key last while the DDL puts it first.
pub fn copy_statements(config: &Config) -> Vec<String> {
    COPY_TARGETS
        .iter()
        .map(|(table, columns, file)| {
            format!(
                "COPY {table} ({columns})\n\
                 FROM 's3://{bucket}/data/{file}'\n\
                 IAM_ROLE '{role}'\n\
                 CSV\n\
                 IGNOREHEADER 1;",
                bucket = config.bucket,
                role = config.iam_role,
            )
        })
        .collect()
}

/// Create the schema if absent, then bulk-load every table from the
/// uploaded files.
pub async fn load_warehouse(
    executor: &impl SqlExecutor,
    config: &Config,
) -> Result<(), EtlError> {
    executor.batch_execute(CREATE_TABLES_SQL).await?;
    info!("warehouse schema ensured");

    for stmt in copy_statements(config) {
        debug!(statement = %stmt, "bulk copy");
        executor.batch_execute(&stmt).await?;
    }
    info!(tables = COPY_TARGETS.len(), "warehouse load complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn test_config() -> Config {
        Config {
            bucket: "sales-mart".to_string(),
            iam_role: "arn:aws:iam::123456789012:role/redshift-copy".to_string(),
            source_bucket: "sales-raw".to_string(),
            source_key: "sales.csv".to_string(),
            warehouse_endpoint: "localhost".to_string(),
            warehouse_port: 5439,
            warehouse_db: "dev".to_string(),
            warehouse_user: "etl".to_string(),
            warehouse_password: "secret".to_string(),
            data_dir: PathBuf::from("data"),
        }
    }

    #[derive(Default)]
    struct RecordingExecutor {
        statements: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl SqlExecutor for RecordingExecutor {
        async fn batch_execute(&self, sql: &str) -> Result<(), EtlError> {
            if self.fail {
                return Err(EtlError::Load("relation does not exist".to_string()));
            }
            self.statements.lock().unwrap().push(sql.to_string());
            Ok(())
        }
    }

    #[test]
    fn ddl_defines_the_corrected_schema() {
        for table in [
            "branches",
            "customer_types",
            "genders",
            "product_lines",
            "payments",
            "dates",
            "sales",
        ] {
            assert!(
                CREATE_TABLES_SQL.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")),
                "missing {table}"
            );
        }
        // exactly one calendar table; the fact table references it
        assert_eq!(CREATE_TABLES_SQL.matches("IF NOT EXISTS dates").count(), 1);
        assert!(CREATE_TABLES_SQL.contains("REFERENCES customer_types (customer_id)"));
        assert!(CREATE_TABLES_SQL.contains("REFERENCES dates (date_id)"));
    }

    #[test]
    fn copy_statements_cover_every_output_file() {
        let stmts = copy_statements(&test_config());
        assert_eq!(stmts.len(), 7);

        for stmt in &stmts {
            assert!(stmt.contains("FROM 's3://sales-mart/data/"), "{stmt}");
            assert!(stmt.contains("IAM_ROLE 'arn:aws:iam::123456789012:role/redshift-copy'"));
            assert!(stmt.contains("IGNOREHEADER 1"));
        }

        // the fact table loads last, after every dimension it references
        assert!(stmts[6].starts_with("COPY sales "));
        assert!(stmts[6].contains("df_final.csv"));
    }

    #[test]
    fn copy_columns_follow_the_csv_layout() {
        let stmts = copy_statements(&test_config());
        assert!(stmts[0].starts_with("COPY branches (city, branch, branch_id)"));
        assert!(stmts[5].contains("(c_date, c_year, c_month, c_day, c_weekday, date_id)"));
    }

    #[tokio::test]
    async fn ddl_runs_before_any_copy() {
        let executor = RecordingExecutor::default();
        load_warehouse(&executor, &test_config()).await.unwrap();

        let statements = executor.statements.lock().unwrap();
        assert_eq!(statements.len(), 8);
        assert!(statements[0].contains("CREATE TABLE IF NOT EXISTS branches"));
        assert!(statements[1].starts_with("COPY branches"));
        assert!(statements[7].starts_with("COPY sales"));
    }

    #[tokio::test]
    async fn statement_failure_is_a_load_error() {
        let executor = RecordingExecutor {
            fail: true,
            ..Default::default()
        };
        let err = load_warehouse(&executor, &test_config()).await.unwrap_err();
        assert!(matches!(err, EtlError::Load(_)), "got: {err:?}");
    }
}
