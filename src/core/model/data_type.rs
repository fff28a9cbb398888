//! Field data types

use std::str::FromStr;

/// Declared data type of a form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    #[default]
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    Time,
    DateTime,
    Geopoint,
    Geotrace,
    Geoshape,
    Binary,
    Barcode,
    /// Single choice (`select1`)
    Choice,
    /// Multiple choice (`select`), space-separated values
    ChoiceList,
}

impl DataType {
    /// Types whose empty value is exported as a bare empty cell
    pub fn allows_blank(&self) -> bool {
        matches!(
            self,
            DataType::Date | DataType::Time | DataType::DateTime | DataType::Geopoint
        )
    }

    /// Types that carry coordinates
    pub fn is_spatial(&self) -> bool {
        matches!(
            self,
            DataType::Geopoint | DataType::Geotrace | DataType::Geoshape
        )
    }
}

impl FromStr for DataType {
    type Err = String;

    /// Parses an XForm bind type, with or without an `xsd:` style prefix
    ///
    /// Unknown types map to [`DataType::Text`] so unusual forms still export.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let local = s.rsplit(':').next().unwrap_or(s);
        Ok(match local {
            "int" | "integer" | "long" => DataType::Integer,
            "decimal" | "double" | "float" => DataType::Decimal,
            "boolean" => DataType::Boolean,
            "date" => DataType::Date,
            "time" => DataType::Time,
            "dateTime" => DataType::DateTime,
            "geopoint" => DataType::Geopoint,
            "geotrace" => DataType::Geotrace,
            "geoshape" => DataType::Geoshape,
            "binary" => DataType::Binary,
            "barcode" => DataType::Barcode,
            "select1" => DataType::Choice,
            "select" => DataType::ChoiceList,
            _ => DataType::Text,
        })
    }
}
