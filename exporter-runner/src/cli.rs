use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Exports append-only tables into dated archives, one id range per day.
#[derive(Parser, Debug)]
#[command(name = "exporter", about = "Exports time-ordered tables into dated CSV archives")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Locate the id range of every day from `--from` to `--to` and record it in the ledger
    Locate {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Locate one day and export every configured table for it
    Export {
        #[arg(long)]
        date: NaiveDate,
        /// Process the range as two halves archived separately
        #[arg(long)]
        split: bool,
    },
    /// Export every day recorded in the ledger between `--from` and `--to`
    ExportLedger {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        /// Process each range as two halves archived separately
        #[arg(long)]
        split: bool,
    },
    /// Merge split part archives into one archive per range
    Combine {
        /// Only combine this table's directory
        #[arg(long)]
        table: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn export_ledger_parses_dates_and_split() {
        let args = Args::parse_from([
            "exporter",
            "export-ledger",
            "--from",
            "2025-01-01",
            "--to",
            "2025-01-07",
            "--split",
        ]);

        let Command::ExportLedger { from, to, split } = args.command else {
            panic!("expected export-ledger");
        };
        assert_eq!(from, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2025, 1, 7).unwrap());
        assert!(split);
    }
}
