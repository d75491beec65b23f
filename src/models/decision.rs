use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Outcome of comparing one catalog price against the scraped website price.
///
/// Serialized into the decision CSV as `NO`, `YES` or `ERROR - <reason>` so
/// the file stays directly reviewable in a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeStatus {
    No,
    Yes,
    Error(String),
}

impl ChangeStatus {
    pub fn is_yes(&self) -> bool {
        matches!(self, ChangeStatus::Yes)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ChangeStatus::Error(_))
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeStatus::No => write!(f, "NO"),
            ChangeStatus::Yes => write!(f, "YES"),
            ChangeStatus::Error(reason) => write!(f, "ERROR - {}", reason),
        }
    }
}

impl FromStr for ChangeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed {
            "NO" => Ok(ChangeStatus::No),
            "YES" => Ok(ChangeStatus::Yes),
            _ => {
                if let Some(reason) = trimmed.strip_prefix("ERROR - ") {
                    Ok(ChangeStatus::Error(reason.to_string()))
                } else if trimmed.strip_prefix("ERROR").is_some() {
                    Ok(ChangeStatus::Error(String::new()))
                } else {
                    Err(format!("unrecognized price_change_needed value: {trimmed:?}"))
                }
            }
        }
    }
}

impl Serialize for ChangeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChangeStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One row of the decision CSV handed off for manual review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub product_id: String,
    pub old_price: Option<f64>,
    pub new_price: Option<f64>,
    pub price_change_needed: ChangeStatus,
}

impl Decision {
    pub fn new(product_id: impl Into<String>, old_price: Option<f64>) -> Self {
        Self {
            product_id: product_id.into(),
            old_price,
            new_price: None,
            price_change_needed: ChangeStatus::No,
        }
    }
}

pub const DECISION_COLUMNS: [&str; 4] =
    ["product_id", "old_price", "new_price", "price_change_needed"];

/// Read a decision CSV, verifying it still carries the four review columns.
pub fn read_decisions(path: impl AsRef<std::path::Path>) -> crate::Result<Vec<Decision>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    for column in DECISION_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(crate::AppError::MissingColumn {
                column: column.to_string(),
                file: path.display().to_string(),
            });
        }
    }
    let mut decisions = Vec::new();
    for record in reader.deserialize() {
        decisions.push(record?);
    }
    Ok(decisions)
}

pub fn write_decisions(
    path: impl AsRef<std::path::Path>,
    decisions: &[Decision],
) -> crate::Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for decision in decisions {
        writer.serialize(decision)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            ChangeStatus::No,
            ChangeStatus::Yes,
            ChangeStatus::Error("No URL".to_string()),
        ] {
            let text = status.to_string();
            assert_eq!(text.parse::<ChangeStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_error_status_formatting() {
        let status = ChangeStatus::Error("Page timeout or failed to load".to_string());
        assert_eq!(status.to_string(), "ERROR - Page timeout or failed to load");
        assert!(status.is_error());
    }

    #[test]
    fn test_decision_csv_round_trip() {
        let decision = Decision {
            product_id: "P1".to_string(),
            old_price: Some(100.0),
            new_price: Some(120.0),
            price_change_needed: ChangeStatus::Yes,
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(&decision).unwrap();
        let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let parsed: Decision = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(parsed, decision);
    }

    #[test]
    fn test_read_decisions_rejects_missing_columns() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "product_id,old_price").unwrap();
        writeln!(file, "P1,100").unwrap();
        file.flush().unwrap();

        let err = read_decisions(file.path()).unwrap_err();
        assert!(matches!(err, crate::AppError::MissingColumn { .. }));
    }

    #[test]
    fn test_decision_file_round_trip() {
        let decisions = vec![
            Decision {
                product_id: "P1".to_string(),
                old_price: Some(100.0),
                new_price: Some(120.0),
                price_change_needed: ChangeStatus::Yes,
            },
            Decision {
                product_id: "P2".to_string(),
                old_price: Some(50.0),
                new_price: None,
                price_change_needed: ChangeStatus::Error("No URL".to_string()),
            },
        ];

        let file = tempfile::NamedTempFile::new().unwrap();
        write_decisions(file.path(), &decisions).unwrap();
        assert_eq!(read_decisions(file.path()).unwrap(), decisions);
    }

    #[test]
    fn test_missing_new_price_deserializes_as_none() {
        let data = "product_id,old_price,new_price,price_change_needed\nP1,100.0,,ERROR - No URL\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let parsed: Decision = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(parsed.new_price, None);
        assert!(parsed.price_change_needed.is_error());
    }
}
