use tabled::{builder::Builder, settings::Style, Table, Tabled};
use crate::record::Schema;
use crate::DynamicRecord;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

/// Render mirrored records with one column per schema column, null as `NULL`
pub fn records_table<'a>(schema: &Schema, records: impl IntoIterator<Item = &'a DynamicRecord>) -> String {
    let mut builder = Builder::default();
    builder.push_record(schema.column_names().map(str::to_string));
    for record in records {
        builder.push_record(schema.column_names().map(|name| match record.get(name) {
            Some(value) if !value.is_null() => value.to_string(),
            _ => "NULL".to_string(),
        }));
    }
    builder.build().with(Style::rounded()).to_string()
}
