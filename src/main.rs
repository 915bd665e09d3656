mod base;
mod builder;
mod combine;
mod koinly;
mod novadax;
mod time;
mod transaction;

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;

use transaction::Transaction;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let input_path = match args.as_slice() {
        [_, flag] if flag == "-v" || flag == "--version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        [_, path] => PathBuf::from(path),
        _ => {
            eprintln!("Usage: novadax-koinly <novadax-csv>");
            return ExitCode::FAILURE;
        }
    };

    if !input_path.exists() {
        eprintln!("Error: No such file: {}", input_path.display());
        return ExitCode::FAILURE;
    }

    match convert(&input_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn convert(input_path: &Path) -> Result<()> {
    let rows = read_rows(input_path)?;
    let transactions = process(&rows)?;
    koinly::save_koinly_csv(&transactions, &output_path(input_path))
}

/// Runs the conversion pipeline over raw rows already in chronological
/// order: parse, assemble composites, combine duplicates, sort by date.
fn process(rows: &[csv::StringRecord]) -> Result<Vec<Transaction>> {
    let operations = rows
        .iter()
        .map(novadax::operation_from_record)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let assembled = builder::assemble(operations)?;
    let mut combined = combine::combine(assembled)?;
    combined.sort_by_key(Transaction::date);
    Ok(combined)
}

/// Reads the export rows, skipping the header and reversing to
/// chronological order: NovaDAX emits newest-first, and trade legs must
/// precede their fee rows for matching to work.
///
/// Exports have been seen with broken encodings, so undecodable bytes are
/// dropped rather than failing the run.
fn read_rows(input_path: &Path) -> Result<Vec<csv::StringRecord>> {
    let bytes = std::fs::read(input_path)?;
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
    rows.reverse();
    Ok(rows)
}

fn output_path(input_path: &Path) -> PathBuf {
    let name = input_path.to_string_lossy();
    let stem = name.strip_suffix(".csv").unwrap_or(&name);
    PathBuf::from(format!("{stem}_koinly_universal.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_from(raw: &str) -> Vec<csv::StringRecord> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(raw.as_bytes());
        let mut rows = rdr.records().collect::<Result<Vec<_>, _>>().unwrap();
        rows.reverse();
        rows
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("exports/novadax.csv")),
            PathBuf::from("exports/novadax_koinly_universal.csv")
        );
        assert_eq!(
            output_path(Path::new("history")),
            PathBuf::from("history_koinly_universal.csv")
        );
    }

    #[test]
    fn test_read_rows_reverses_and_tolerates_any_encoding() {
        let mut contents = Vec::new();
        contents.extend_from_slice(b"hea,ders,x\r");
        contents.extend_from_slice(b"foo,");
        contents.extend_from_slice(&[0x81, 0xff, 0xfe]);
        contents.extend_from_slice(b"bar");
        contents.extend_from_slice("\u{fffd}".as_bytes());
        contents.extend_from_slice(b",");
        contents.extend_from_slice(&[0x80]);
        contents.extend_from_slice(b"test");

        let path = env::temp_dir().join("novadax-koinly-read-rows-test.csv");
        std::fs::write(&path, &contents).unwrap();
        let rows = read_rows(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(rows.len(), 1);
        let fields: Vec<&str> = rows[0].iter().collect();
        // invalid bytes are dropped; an encoded U+FFFD is real data and stays
        assert_eq!(fields, vec!["foo", "bar\u{fffd}", "test"]);
    }

    #[test]
    fn test_process_end_to_end() {
        // raw export order is newest-first; the fee row precedes its legs
        let raw = "\
Data,Resumo,Moeda,Valor,Status
21/03/2025 09:00:00,Saque de criptomoedas,XYZ,-7 XYZ(≈R$3.50),Sucesso
20/03/2025 10:00:00,Taxa de transação,XYZ,-1 XYZ(≈R$0.50),Sucesso
20/03/2025 10:00:00,Compra(XYZ/BRL),BRL,-50 BRL(≈R$50),Sucesso
20/03/2025 10:00:00,Compra(XYZ/BRL),XYZ,+100 XYZ(≈R$50),Sucesso
";
        let transactions = process(&rows_from(raw)).unwrap();
        assert_eq!(transactions.len(), 2);

        let mut buffer = Vec::new();
        koinly::write_koinly_csv(&transactions, &mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "2025-03-20 10:00:00,50,BRL,100,XYZ,1,XYZ,,,trade,Compra(XYZ/BRL),"
        );
        assert_eq!(
            lines[2],
            "2025-03-21 09:00:00,7,XYZ,,,,,,,withdraw,Saque de criptomoedas,"
        );
    }

    #[test]
    fn test_process_split_purchase_is_combined() {
        let raw = "\
Data,Resumo,Moeda,Valor,Status
20/03/2025 10:00:00,Taxa de transação,XYZ,\"-0,2 XYZ\",Sucesso
20/03/2025 10:00:00,Compra(XYZ/BRL),BRL,-8 BRL,Sucesso
20/03/2025 10:00:00,Compra(XYZ/BRL),XYZ,+20 XYZ,Sucesso
20/03/2025 10:00:00,Taxa de transação,XYZ,\"-0,1 XYZ\",Sucesso
20/03/2025 10:00:00,Compra(XYZ/BRL),BRL,-5 BRL,Sucesso
20/03/2025 10:00:00,Compra(XYZ/BRL),XYZ,+10 XYZ,Sucesso
";
        let transactions = process(&rows_from(raw)).unwrap();
        assert_eq!(transactions.len(), 1);

        let mut buffer = Vec::new();
        koinly::write_koinly_csv(&transactions, &mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(
            lines[1],
            "2025-03-20 10:00:00,13,BRL,30,XYZ,0.3,XYZ,,,trade,Compra(XYZ/BRL),"
        );
    }

    #[test]
    fn test_process_rejects_incomplete_trades() {
        let raw = "\
Data,Resumo,Moeda,Valor,Status
20/03/2025 10:00:00,Compra(XYZ/BRL),BRL,-50 BRL,Sucesso
20/03/2025 10:00:00,Compra(XYZ/BRL),XYZ,+100 XYZ,Sucesso
";
        let err = process(&rows_from(raw)).unwrap_err();
        assert!(err.to_string().contains("could not complete"));
    }
}
