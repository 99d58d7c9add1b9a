//! Parse command - extract fields from a single confirmation.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use rust_decimal::Decimal;
use tracing::{debug, info};

use poconf_core::{ParseInput, ParsedConfirmationFieldsV1, ParsedField};

use super::{build_parser, load_config};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Email body text file
    #[arg(short, long)]
    email: Option<PathBuf>,

    /// Text extracted from a PDF attachment (repeatable; the file name is the attachment id)
    #[arg(short, long = "pdf-text")]
    pdf_text: Vec<PathBuf>,

    /// Buyer purchase-order number
    #[arg(long)]
    po: Option<String>,

    /// Purchase-order line id
    #[arg(long)]
    line: Option<String>,

    /// Ordered quantity from the system of record
    #[arg(long)]
    expected_qty: Option<Decimal>,

    /// Ordered unit price from the system of record
    #[arg(long)]
    expected_unit_price: Option<Decimal>,

    /// Id of the inbound message
    #[arg(long)]
    message_id: Option<String>,

    /// Include every ranked candidate in the output
    #[arg(long)]
    debug: bool,

    /// Rules only; never call the completion service
    #[arg(long)]
    no_llm: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if args.email.is_none() && args.pdf_text.is_empty() {
        anyhow::bail!("Nothing to parse: pass --email and/or --pdf-text");
    }

    let input = build_input(&args)?;
    let parser = build_parser(&config, args.no_llm)?;
    info!(
        "Parsing confirmation: {} PDF text(s), email={}, completion fallback={}",
        input.pdf_texts.len(),
        input.email_text.is_some(),
        parser.has_llm()
    );

    let result = parser.parse(&input).await?;

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&result)?,
        OutputFormat::Text => format_text(&result),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn build_input(args: &ParseArgs) -> anyhow::Result<ParseInput> {
    let mut input = ParseInput::new().with_debug(args.debug);

    if let Some(path) = &args.email {
        input = input.with_email_text(read_text(path)?);
    }
    for path in &args.pdf_text {
        let attachment_id = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment")
            .to_string();
        input = input.with_pdf_text(attachment_id, read_text(path)?);
    }

    if let Some(po) = &args.po {
        input = input.with_po_number(po);
    }
    if let Some(line) = &args.line {
        input = input.with_line_id(line);
    }
    if let Some(qty) = args.expected_qty {
        input = input.with_expected_qty(qty);
    }
    if let Some(price) = args.expected_unit_price {
        input = input.with_expected_unit_price(price);
    }
    if let Some(id) = &args.message_id {
        input = input.with_message_id(id);
    }

    Ok(input)
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }
    Ok(fs::read_to_string(path)?)
}

fn format_text(result: &ParsedConfirmationFieldsV1) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Method: {:?}  Evidence: {:?}\n\n",
        result.extraction_method, result.evidence_source
    ));

    push_field(&mut output, "Supplier order", &result.supplier_order_number);
    push_field(&mut output, "Delivery date", &result.confirmed_delivery_date);
    push_field(&mut output, "Confirmed qty", &result.supplier_confirmed_quantity);
    push_field(&mut output, "Ordered qty", &result.ordered_quantity);
    output.push_str(&format!(
        "  {:<16} {} ({})\n",
        "Qty mismatch",
        result
            .quantity_mismatch
            .value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string()),
        result.quantity_mismatch.reason
    ));

    let c = &result.commercial;
    output.push('\n');
    push_field(&mut output, "Unit price", &c.unit_price);
    push_field(&mut output, "Extended price", &c.extended_price);
    push_field(&mut output, "Currency", &c.currency);
    push_field(&mut output, "Payment terms", &c.payment_terms);
    push_field(&mut output, "Freight terms", &c.freight_terms);
    push_field(&mut output, "Freight cost", &c.freight_cost);
    push_field(&mut output, "Subtotal", &c.subtotal);
    push_field(&mut output, "Tax", &c.tax);
    push_field(&mut output, "Order total", &c.order_total);
    push_field(&mut output, "Notes", &c.notes);
    push_field(&mut output, "Backorder", &c.backorder_status);

    if let Some(change) = &result.price_changed {
        let percent = change
            .price_delta_percent
            .map(|p| format!(" ({p}%)"))
            .unwrap_or_default();
        output.push_str(&format!(
            "\n  Price changed: {} delta {}{}\n",
            change.value, change.price_delta, percent
        ));
    }

    output
}

fn push_field<T: Display>(output: &mut String, label: &str, field: &ParsedField<T>) {
    match &field.value {
        Some(value) => {
            output.push_str(&format!("  {:<16} {} [{:.2}]", label, value, field.confidence));
            if let Some(snippet) = &field.evidence_snippet {
                output.push_str(&format!("  \"{}\"", snippet));
            }
            output.push('\n');
        }
        None => output.push_str(&format!("  {:<16} -\n", label)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poconf_core::ExtractionMethod;

    #[test]
    fn test_format_text_marks_missing_fields() {
        let mut result = ParsedConfirmationFieldsV1::empty(ExtractionMethod::Deterministic);
        result.supplier_order_number = ParsedField::system_of_record(Some("SO-1".to_string()));

        let text = format_text(&result);
        assert!(text.contains("Supplier order   SO-1 [1.00]"));
        assert!(text.contains("Delivery date    -"));
        assert!(!text.contains("Price changed"));
    }
}
