//! The shared dataset predicate every source is held to.

use crate::dataset::Dataset;
use crate::dataset::Record;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    Id,
    Address,
    PropertyType,
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequiredField::Id => "uid",
            RequiredField::Address => "address",
            RequiredField::PropertyType => "property type",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("dataset has no records")]
    Empty,
    #[error("record {index} is missing {field}")]
    MissingField { index: usize, field: RequiredField },
}

/// All-or-nothing: one bad record rejects the whole dataset.
pub fn check(dataset: &Dataset) -> Result<(), ValidationError> {
    if dataset.records.is_empty() {
        return Err(ValidationError::Empty);
    }
    for (index, record) in dataset.records.iter().enumerate() {
        if let Some(field) = missing_field(record) {
            return Err(ValidationError::MissingField { index, field });
        }
    }
    Ok(())
}

pub fn validate(dataset: &Dataset) -> bool {
    check(dataset).is_ok()
}

fn missing_field(record: &Record) -> Option<RequiredField> {
    if record.id.trim().is_empty() {
        Some(RequiredField::Id)
    } else if record.resolved_address().is_none() {
        Some(RequiredField::Address)
    } else if record.resolved_property_type().is_none() {
        Some(RequiredField::PropertyType)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn record(id: &str, address: Option<&str>, property_type: Option<&str>) -> Record {
        Record {
            id: id.to_string(),
            address: address.map(str::to_string),
            property_type: property_type.map(str::to_string),
            ..Record::default()
        }
    }

    fn dataset(records: Vec<Record>) -> Dataset {
        Dataset {
            records,
            ..Dataset::default()
        }
    }

    #[test]
    fn empty_dataset_is_invalid() {
        assert!(!validate(&Dataset::default()));
        assert_eq!(check(&Dataset::default()), Err(ValidationError::Empty));
    }

    #[test]
    fn complete_records_are_valid() {
        let data = dataset(vec![
            record("402604", Some("서울특별시 용산구"), Some("아파트")),
            record("515468", Some("서울특별시 강서구"), Some("아파트")),
        ]);
        assert!(validate(&data));
    }

    #[test]
    fn one_bad_record_rejects_everything() {
        let data = dataset(vec![
            record("1", Some("a"), Some("아파트")),
            record("", Some("b"), Some("아파트")),
        ]);
        assert_matches!(
            check(&data),
            Err(ValidationError::MissingField {
                index: 1,
                field: RequiredField::Id
            })
        );

        let no_address = dataset(vec![record("1", None, Some("아파트"))]);
        assert_matches!(
            check(&no_address),
            Err(ValidationError::MissingField {
                field: RequiredField::Address,
                ..
            })
        );

        let no_type = dataset(vec![record("1", Some("a"), Some(" "))]);
        assert_matches!(
            check(&no_type),
            Err(ValidationError::MissingField {
                field: RequiredField::PropertyType,
                ..
            })
        );
    }

    #[test]
    fn legacy_keys_satisfy_required_fields() {
        let mut legacy = record("7", None, None);
        legacy.road_address = Some("경기도 성남시".to_string());
        legacy.legacy_type = Some("오피스텔".to_string());
        assert!(validate(&dataset(vec![legacy])));
    }
}
