//! Output formatting for CLI results

use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use tunnelsync::Result;

use crate::cli::OutputFormat;

pub mod json;
pub mod table;

/// Print a list: `R` display rows as a table, or the records themselves as JSON
pub fn print_list<T, R>(format: OutputFormat, items: &[T]) -> Result<()>
where
    T: Serialize,
    R: Tabled + for<'a> From<&'a T>,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = items.iter().map(R::from).collect();
            println!("{}", table::format_table(&rows));
        }
        OutputFormat::Json => println!("{}", json::format_json(items)?),
    }
    Ok(())
}

/// Print the outcome message of a mutation
pub fn print_message(format: OutputFormat, message: &str) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{} {}", "✓".green(), message.trim()),
        OutputFormat::Json => {
            println!(
                "{}",
                json::format_json(&serde_json::json!({ "message": message.trim() }))?
            );
        }
    }
    Ok(())
}
