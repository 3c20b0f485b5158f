use bigdecimal::ToPrimitive;
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::database::models::BankExportRow;
use crate::error::AppError;

pub const BANK_EXPORT_HEADER: [&str; 7] = [
    "rut",
    "nombre_completo",
    "banco",
    "tipo_cuenta",
    "numero_cuenta",
    "monto_clp",
    "referencia",
];

/// Render the bank-transfer file for one batch. Amounts are whole pesos;
/// guards without a default account get blank bank columns.
pub fn render_bank_csv(reference: &str, rows: &[BankExportRow]) -> Result<String, AppError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(BANK_EXPORT_HEADER).map_err(csv_error)?;

    for row in rows {
        let amount = row.amount.round(0).to_i64().ok_or_else(|| {
            AppError::internal_server_error_message(format!(
                "Amount {} for {} does not fit a bank transfer",
                row.amount, row.rut
            ))
        })?;

        let full_name = format!("{} {}", row.first_name, row.last_name);
        let amount = amount.to_string();

        writer
            .write_record([
                row.rut.as_str(),
                full_name.as_str(),
                row.bank_name.as_deref().unwrap_or(""),
                row.account_type.as_deref().unwrap_or(""),
                row.account_number.as_deref().unwrap_or(""),
                amount.as_str(),
                reference,
            ])
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::internal_server_error_message(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AppError::internal_server_error_message(e.to_string()))
}

fn csv_error(error: csv::Error) -> AppError {
    AppError::internal_server_error_message(format!("Failed to write bank export: {}", error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn row(first: &str, last: &str, amount: &str, with_account: bool) -> BankExportRow {
        BankExportRow {
            rut: "12345678-5".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            bank_name: with_account.then(|| "Banco Estado".to_string()),
            account_type: with_account.then(|| "cuenta_rut".to_string()),
            account_number: with_account.then(|| "12345678".to_string()),
            amount: BigDecimal::from_str(amount).unwrap(),
        }
    }

    #[test]
    fn test_header_and_plain_row() {
        let csv = render_bank_csv("HE-2025-W23", &[row("Ana", "Soto", "42000.00", true)]).unwrap();

        assert_eq!(
            csv,
            "rut,nombre_completo,banco,tipo_cuenta,numero_cuenta,monto_clp,referencia\r\n\
             12345678-5,Ana Soto,Banco Estado,cuenta_rut,12345678,42000,HE-2025-W23\r\n"
        );
    }

    #[test]
    fn test_commas_and_quotes_are_escaped() {
        let csv = render_bank_csv(
            "HE-2025-W23",
            &[row("Ana \"La Jefa\"", "Soto, Pérez", "1000", true)],
        )
        .unwrap();

        let line = csv.lines().nth(1).unwrap();
        assert!(
            line.contains(r#""Ana ""La Jefa"" Soto, Pérez""#),
            "{}",
            line
        );
    }

    #[test]
    fn test_missing_account_leaves_bank_columns_blank() {
        let csv = render_bank_csv("HE-2025-W23", &[row("Luis", "Rojas", "15000", false)]).unwrap();

        assert_eq!(
            csv.lines().nth(1).unwrap(),
            "12345678-5,Luis Rojas,,,,15000,HE-2025-W23"
        );
    }

    #[test]
    fn test_amounts_are_rounded_to_whole_pesos() {
        let csv = render_bank_csv("X", &[row("A", "B", "41999.70", true)]).unwrap();
        let amount = csv.lines().nth(1).unwrap().split(',').nth(5).unwrap();
        assert_eq!(amount, "42000");
    }

    #[test]
    fn test_empty_batch_is_header_only() {
        let csv = render_bank_csv("X", &[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
