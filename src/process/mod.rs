//! Transform stage: derive surrogate-keyed dimension tables from the flat
//! sales table, generate the calendar dimension spanning the observed date
//! range, and join everything back into a normalized fact table.

pub mod dates;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::EtlError;
use crate::table::Table;

use self::dates::{generate_date_dimension, parse_transaction_date};

// Source column names, exactly as the dataset's header row spells them.
const COL_INVOICE: &str = "Invoice ID";
const COL_BRANCH: &str = "Branch";
const COL_CITY: &str = "City";
const COL_CUSTOMER_TYPE: &str = "Customer type";
const COL_GENDER: &str = "Gender";
const COL_PRODUCT_LINE: &str = "Product line";
const COL_UNIT_PRICE: &str = "Unit price";
const COL_QUANTITY: &str = "Quantity";
const COL_TAX: &str = "Tax 5%";
const COL_TOTAL: &str = "Total";
const COL_DATE: &str = "Date";
const COL_PAYMENT: &str = "Payment";
const COL_COGS: &str = "cogs";
const COL_MARGIN: &str = "gross margin percentage";
const COL_INCOME: &str = "gross income";
const COL_RATING: &str = "Rating";

/// Persisted header layout of the fact table.
const FACT_HEADERS: [&str; 16] = [
    "invoice_id",
    "unit_price",
    "quantity",
    "tax_5",
    "total",
    "cogs",
    "gross_margin_percentage",
    "gross_income",
    "rating",
    "branch_id",
    "customer_id",
    "gender_id",
    "product_line_id",
    "payment_id",
    "date_id",
    "id",
];

/// Output filenames in upload order. Blob keys are `data/<file>`.
pub const OUTPUT_FILES: [&str; 7] = [
    "branch.csv",
    "customer_type.csv",
    "gender.csv",
    "product_line.csv",
    "payment.csv",
    "dates.csv",
    "df_final.csv",
];

/// The complete star schema produced by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarSchema {
    pub branch: Table,
    pub customer_type: Table,
    pub gender: Table,
    pub product_line: Table,
    pub payment: Table,
    pub dates: Table,
    pub fact: Table,
}

impl StarSchema {
    fn tables(&self) -> [(&'static str, &Table); 7] {
        [
            ("branch.csv", &self.branch),
            ("customer_type.csv", &self.customer_type),
            ("gender.csv", &self.gender),
            ("product_line.csv", &self.product_line),
            ("payment.csv", &self.payment),
            ("dates.csv", &self.dates),
            ("df_final.csv", &self.fact),
        ]
    }

    /// Persist every table as CSV under `dir`, creating it if needed.
    /// Returns the written paths in upload order.
    pub fn write(&self, dir: &Path) -> Result<Vec<PathBuf>, EtlError> {
        fs::create_dir_all(dir)?;
        let mut paths = Vec::with_capacity(OUTPUT_FILES.len());
        for (name, table) in self.tables() {
            let path = dir.join(name);
            table.write_csv(&path)?;
            debug!(path = %path.display(), rows = table.rows.len(), "wrote table");
            paths.push(path);
        }
        Ok(paths)
    }
}

/// Project `table` onto `columns`, drop exact-duplicate rows keeping the
/// first occurrence, and append a dense 1-based `id_column`.
///
/// The scan is ordered and never sorts, so the same input always yields the
/// same row order and key assignment.
pub fn derive_dimension(
    table: &Table,
    columns: &[&str],
    id_column: &str,
) -> Result<Table, EtlError> {
    let indices = columns
        .iter()
        .map(|c| table.column(c))
        .collect::<Result<Vec<_>, _>>()?;

    let mut headers: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    headers.push(id_column.to_string());

    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut rows = Vec::new();
    for row in &table.rows {
        let key: Vec<String> = indices.iter().map(|&i| row[i].clone()).collect();
        if seen.insert(key.clone()) {
            let mut out = key;
            out.push((rows.len() + 1).to_string());
            rows.push(out);
        }
    }

    Ok(Table { headers, rows })
}

/// Lookup from a dimension's key columns to its surrogate-key value.
/// Every column except the trailing id column is part of the key.
fn key_map(dim: &Table) -> HashMap<Vec<String>, String> {
    let key_width = dim.headers.len() - 1;
    dim.rows
        .iter()
        .map(|row| (row[..key_width].to_vec(), row[key_width].clone()))
        .collect()
}

/// Resolve one fact row's key against a dimension, or fail the join
/// invariant. Dimensions are derived from the very table being joined, so
/// a miss means the transform itself is broken; the row is never dropped.
fn lookup<'a>(
    map: &'a HashMap<Vec<String>, String>,
    key: Vec<String>,
    dimension: &str,
    row: usize,
) -> Result<&'a str, EtlError> {
    map.get(&key)
        .map(String::as_str)
        .ok_or_else(|| EtlError::JoinInvariant {
            dimension: dimension.to_string(),
            row,
            key,
        })
}

/// Convert the denormalized sales table into a star schema.
pub fn transform(table: &Table) -> Result<StarSchema, EtlError> {
    if table.rows.is_empty() {
        return Err(EtlError::Parse("source table contains no data rows".into()));
    }

    // 1) dimensions, keyed by their source column(s)
    let mut branch = derive_dimension(table, &[COL_CITY, COL_BRANCH], "branch_id")?;
    let mut customer_type = derive_dimension(table, &[COL_CUSTOMER_TYPE], "customer_id")?;
    let mut gender = derive_dimension(table, &[COL_GENDER], "gender_id")?;
    let mut product_line = derive_dimension(table, &[COL_PRODUCT_LINE], "product_line_id")?;
    let mut payment = derive_dimension(table, &[COL_PAYMENT], "payment_id")?;

    // 2) observed date range
    let date_idx = table.column(COL_DATE)?;
    let mut parsed_dates = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        parsed_dates.push(parse_transaction_date(&row[date_idx])?);
    }
    let min_date = *parsed_dates.iter().min().expect("rows checked non-empty");
    let max_date = *parsed_dates.iter().max().expect("rows checked non-empty");

    // 3) dense calendar covering the full span, transaction or not
    let dates = generate_date_dimension(min_date, max_date)?;
    info!(
        start = %min_date,
        end = %max_date,
        days = dates.rows.len(),
        "generated date dimension"
    );

    // 4) join each fact row against every dimension, substituting keys
    let branch_map = key_map(&branch);
    let customer_map = key_map(&customer_type);
    let gender_map = key_map(&gender);
    let product_map = key_map(&product_line);
    let payment_map = key_map(&payment);

    let d_date = dates.column("date")?;
    let d_id = dates.column("date_id")?;
    let date_map: HashMap<&str, &str> = dates
        .rows
        .iter()
        .map(|r| (r[d_date].as_str(), r[d_id].as_str()))
        .collect();

    let city = table.column(COL_CITY)?;
    let branch_col = table.column(COL_BRANCH)?;
    let customer_col = table.column(COL_CUSTOMER_TYPE)?;
    let gender_col = table.column(COL_GENDER)?;
    let product_col = table.column(COL_PRODUCT_LINE)?;
    let payment_col = table.column(COL_PAYMENT)?;

    let invoice = table.column(COL_INVOICE)?;
    let unit_price = table.column(COL_UNIT_PRICE)?;
    let quantity = table.column(COL_QUANTITY)?;
    let tax = table.column(COL_TAX)?;
    let total = table.column(COL_TOTAL)?;
    let cogs = table.column(COL_COGS)?;
    let margin = table.column(COL_MARGIN)?;
    let income = table.column(COL_INCOME)?;
    let rating = table.column(COL_RATING)?;

    // 5)–7) the fact layout below carries measures plus surrogate keys
    // only; the replaced descriptive columns (and Time, when present) are
    // simply not copied over
    let mut fact = Table::new(FACT_HEADERS.iter().map(|h| h.to_string()).collect());
    for (i, row) in table.rows.iter().enumerate() {
        let row_no = i + 1;

        let branch_id = lookup(
            &branch_map,
            vec![row[city].clone(), row[branch_col].clone()],
            "branch",
            row_no,
        )?;
        let customer_id = lookup(
            &customer_map,
            vec![row[customer_col].clone()],
            "customer_type",
            row_no,
        )?;
        let gender_id = lookup(&gender_map, vec![row[gender_col].clone()], "gender", row_no)?;
        let product_line_id = lookup(
            &product_map,
            vec![row[product_col].clone()],
            "product_line",
            row_no,
        )?;
        let payment_id = lookup(
            &payment_map,
            vec![row[payment_col].clone()],
            "payment",
            row_no,
        )?;

        let iso = parsed_dates[i].format("%Y-%m-%d").to_string();
        let date_id = date_map
            .get(iso.as_str())
            .copied()
            .ok_or_else(|| EtlError::JoinInvariant {
                dimension: "dates".to_string(),
                row: row_no,
                key: vec![iso.clone()],
            })?;

        fact.rows.push(vec![
            row[invoice].clone(),
            row[unit_price].clone(),
            row[quantity].clone(),
            row[tax].clone(),
            row[total].clone(),
            row[cogs].clone(),
            row[margin].clone(),
            row[income].clone(),
            row[rating].clone(),
            branch_id.to_string(),
            customer_id.to_string(),
            gender_id.to_string(),
            product_line_id.to_string(),
            payment_id.to_string(),
            date_id.to_string(),
            row_no.to_string(),
        ]);
    }

    info!(
        facts = fact.rows.len(),
        branches = branch.rows.len(),
        customer_types = customer_type.rows.len(),
        genders = gender.rows.len(),
        product_lines = product_line.rows.len(),
        payments = payment.rows.len(),
        "normalized into star schema"
    );

    // align dimension headers with the persisted schema
    branch.rename(&[(COL_CITY, "city"), (COL_BRANCH, "branch")]);
    customer_type.rename(&[(COL_CUSTOMER_TYPE, "customer_type")]);
    gender.rename(&[(COL_GENDER, "gender")]);
    product_line.rename(&[(COL_PRODUCT_LINE, "product_line")]);
    payment.rename(&[(COL_PAYMENT, "payment")]);

    Ok(StarSchema {
        branch,
        customer_type,
        gender,
        product_line,
        payment,
        dates,
        fact,
    })
}
