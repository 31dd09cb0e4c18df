//! Source type -> graph type lookup.
//!
//! One closed table per driver family. Lookups are case-insensitive and
//! ignore precision/length suffixes; anything unknown falls back to
//! `STRING` and leaves a warning on the run context.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::MappingError;
use crate::pipeline::MappingContext;

/// Scalar types of the target graph store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetType {
    String,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Decimal,
    Date,
    Datetime,
    Boolean,
    Binary,
    Embedded,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::String => "STRING",
            TargetType::Short => "SHORT",
            TargetType::Integer => "INTEGER",
            TargetType::Long => "LONG",
            TargetType::Float => "FLOAT",
            TargetType::Double => "DOUBLE",
            TargetType::Decimal => "DECIMAL",
            TargetType::Date => "DATE",
            TargetType::Datetime => "DATETIME",
            TargetType::Boolean => "BOOLEAN",
            TargetType::Binary => "BINARY",
            TargetType::Embedded => "EMBEDDED",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.to_ascii_uppercase().as_str() {
            "STRING" => TargetType::String,
            "SHORT" => TargetType::Short,
            "INTEGER" => TargetType::Integer,
            "LONG" => TargetType::Long,
            "FLOAT" => TargetType::Float,
            "DOUBLE" => TargetType::Double,
            "DECIMAL" => TargetType::Decimal,
            "DATE" => TargetType::Date,
            "DATETIME" => TargetType::Datetime,
            "BOOLEAN" => TargetType::Boolean,
            "BINARY" => TargetType::Binary,
            "EMBEDDED" => TargetType::Embedded,
            _ => return Err(MappingError::invalid_value("type", s, "property")),
        };
        Ok(parsed)
    }
}

use TargetType as T;

const GENERIC: &[(&str, TargetType)] = &[
    ("char", T::String),
    ("character", T::String),
    ("character varying", T::String),
    ("char varying", T::String),
    ("varchar", T::String),
    ("nchar", T::String),
    ("nvarchar", T::String),
    ("longvarchar", T::String),
    ("clob", T::String),
    ("character large object", T::String),
    ("text", T::String),
    ("smallint", T::Short),
    ("tinyint", T::Short),
    ("integer", T::Integer),
    ("int", T::Integer),
    ("bigint", T::Long),
    ("real", T::Float),
    ("float", T::Double),
    ("double", T::Double),
    ("double precision", T::Double),
    ("numeric", T::Decimal),
    ("decimal", T::Decimal),
    ("date", T::Date),
    ("time", T::String),
    ("timestamp", T::Datetime),
    ("timestamp with time zone", T::Datetime),
    ("boolean", T::Boolean),
    ("bit", T::Boolean),
    ("binary", T::Binary),
    ("varbinary", T::Binary),
    ("binary varying", T::Binary),
    ("blob", T::Binary),
    ("binary large object", T::Binary),
];

const SQLITE: &[(&str, TargetType)] = &[
    ("integer", T::Long),
    ("int", T::Integer),
    ("smallint", T::Short),
    ("bigint", T::Long),
    ("real", T::Double),
    ("double", T::Double),
    ("float", T::Double),
    ("numeric", T::Decimal),
    ("decimal", T::Decimal),
    ("text", T::String),
    ("varchar", T::String),
    ("char", T::String),
    ("clob", T::String),
    ("blob", T::Binary),
    ("boolean", T::Boolean),
    ("date", T::Date),
    ("datetime", T::Datetime),
    ("timestamp", T::Datetime),
];

const MYSQL: &[(&str, TargetType)] = &[
    ("char", T::String),
    ("varchar", T::String),
    ("tinytext", T::String),
    ("text", T::String),
    ("mediumtext", T::String),
    ("longtext", T::String),
    ("enum", T::String),
    ("set", T::String),
    ("tinyint", T::Short),
    ("smallint", T::Short),
    ("mediumint", T::Integer),
    ("int", T::Integer),
    ("integer", T::Integer),
    ("bigint", T::Long),
    ("float", T::Float),
    ("double", T::Double),
    ("real", T::Double),
    ("decimal", T::Decimal),
    ("numeric", T::Decimal),
    ("date", T::Date),
    ("datetime", T::Datetime),
    ("timestamp", T::Datetime),
    ("time", T::String),
    ("year", T::Integer),
    ("bit", T::Boolean),
    ("bool", T::Boolean),
    ("boolean", T::Boolean),
    ("binary", T::Binary),
    ("varbinary", T::Binary),
    ("tinyblob", T::Binary),
    ("blob", T::Binary),
    ("mediumblob", T::Binary),
    ("longblob", T::Binary),
    ("json", T::Embedded),
];

const POSTGRESQL: &[(&str, TargetType)] = &[
    ("text", T::String),
    ("character", T::String),
    ("character varying", T::String),
    ("char", T::String),
    ("varchar", T::String),
    ("uuid", T::String),
    ("int2", T::Short),
    ("smallint", T::Short),
    ("int", T::Integer),
    ("int4", T::Integer),
    ("integer", T::Integer),
    ("serial", T::Integer),
    ("int8", T::Long),
    ("bigint", T::Long),
    ("bigserial", T::Long),
    ("real", T::Float),
    ("float4", T::Float),
    ("float8", T::Double),
    ("double precision", T::Double),
    ("numeric", T::Decimal),
    ("decimal", T::Decimal),
    ("money", T::Decimal),
    ("date", T::Date),
    ("timestamp", T::Datetime),
    ("timestamptz", T::Datetime),
    ("timestamp with time zone", T::Datetime),
    ("timestamp without time zone", T::Datetime),
    ("time", T::String),
    ("bool", T::Boolean),
    ("boolean", T::Boolean),
    ("bytea", T::Binary),
    ("json", T::Embedded),
    ("jsonb", T::Embedded),
];

const HSQLDB: &[(&str, TargetType)] = &[
    ("character", T::String),
    ("character varying", T::String),
    ("char", T::String),
    ("varchar", T::String),
    ("longvarchar", T::String),
    ("clob", T::String),
    ("tinyint", T::Short),
    ("smallint", T::Short),
    ("integer", T::Integer),
    ("bigint", T::Long),
    ("real", T::Double),
    ("float", T::Double),
    ("double", T::Double),
    ("numeric", T::Decimal),
    ("decimal", T::Decimal),
    ("bit", T::String),
    ("date", T::Datetime),
    ("time", T::String),
    ("timestamp", T::Datetime),
    ("boolean", T::Boolean),
    ("binary", T::Binary),
    ("varbinary", T::Binary),
    ("longvarbinary", T::Binary),
    ("blob", T::Binary),
];

const ORACLE: &[(&str, TargetType)] = &[
    ("char", T::String),
    ("nchar", T::String),
    ("varchar", T::String),
    ("varchar2", T::String),
    ("nvarchar2", T::String),
    ("clob", T::String),
    ("nclob", T::String),
    ("long", T::String),
    ("number", T::Decimal),
    ("float", T::Double),
    ("binary_float", T::Float),
    ("binary_double", T::Double),
    ("date", T::Datetime),
    ("timestamp", T::Datetime),
    ("timestamp with time zone", T::Datetime),
    ("timestamp with local time zone", T::Datetime),
    ("raw", T::Binary),
    ("long raw", T::Binary),
    ("blob", T::Binary),
];

const SQLSERVER: &[(&str, TargetType)] = &[
    ("char", T::String),
    ("varchar", T::String),
    ("nchar", T::String),
    ("nvarchar", T::String),
    ("text", T::String),
    ("ntext", T::String),
    ("uniqueidentifier", T::String),
    ("tinyint", T::Short),
    ("smallint", T::Short),
    ("int", T::Integer),
    ("bigint", T::Long),
    ("real", T::Float),
    ("float", T::Double),
    ("decimal", T::Decimal),
    ("numeric", T::Decimal),
    ("money", T::Decimal),
    ("smallmoney", T::Decimal),
    ("date", T::Date),
    ("datetime", T::Datetime),
    ("datetime2", T::Datetime),
    ("smalldatetime", T::Datetime),
    ("datetimeoffset", T::Datetime),
    ("time", T::String),
    ("bit", T::Boolean),
    ("binary", T::Binary),
    ("varbinary", T::Binary),
    ("image", T::Binary),
];

/// Driver family selecting the lookup table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverTypeMap {
    #[default]
    Generic,
    Sqlite,
    Mysql,
    Postgresql,
    Hsqldb,
    Oracle,
    Sqlserver,
}

impl DriverTypeMap {
    fn table(&self) -> &'static [(&'static str, TargetType)] {
        match self {
            DriverTypeMap::Generic => GENERIC,
            DriverTypeMap::Sqlite => SQLITE,
            DriverTypeMap::Mysql => MYSQL,
            DriverTypeMap::Postgresql => POSTGRESQL,
            DriverTypeMap::Hsqldb => HSQLDB,
            DriverTypeMap::Oracle => ORACLE,
            DriverTypeMap::Sqlserver => SQLSERVER,
        }
    }

    /// Exact-table lookup, `None` when the type is not listed
    pub fn lookup(&self, source_type: &str) -> Option<TargetType> {
        let key = normalize(source_type);
        self.table()
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, target)| *target)
    }
}

impl fmt::Display for DriverTypeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverTypeMap::Generic => "generic",
            DriverTypeMap::Sqlite => "sqlite",
            DriverTypeMap::Mysql => "mysql",
            DriverTypeMap::Postgresql => "postgresql",
            DriverTypeMap::Hsqldb => "hsqldb",
            DriverTypeMap::Oracle => "oracle",
            DriverTypeMap::Sqlserver => "sqlserver",
        };
        f.write_str(name)
    }
}

impl FromStr for DriverTypeMap {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" => Ok(DriverTypeMap::Generic),
            "sqlite" => Ok(DriverTypeMap::Sqlite),
            "mysql" => Ok(DriverTypeMap::Mysql),
            "postgresql" | "postgres" => Ok(DriverTypeMap::Postgresql),
            "hsqldb" => Ok(DriverTypeMap::Hsqldb),
            "oracle" => Ok(DriverTypeMap::Oracle),
            "sqlserver" => Ok(DriverTypeMap::Sqlserver),
            other => Err(MappingError::invalid_value("driver", other, "run settings")),
        }
    }
}

/// `"VARCHAR(20)"` -> `"varchar"`, `"int unsigned"` -> `"int"`
fn normalize(source_type: &str) -> String {
    let base = match source_type.find('(') {
        Some(index) => &source_type[..index],
        None => source_type,
    };
    let lowered = base.trim().to_ascii_lowercase();
    lowered
        .strip_suffix(" unsigned")
        .map(|s| s.trim().to_string())
        .unwrap_or(lowered)
}

/// Function-shaped resolver over one driver table
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeResolver {
    driver: DriverTypeMap,
}

impl TypeResolver {
    pub fn new(driver: DriverTypeMap) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> DriverTypeMap {
        self.driver
    }

    /// Resolve a source type, falling back to `STRING` with a warning
    pub fn resolve(&self, source_type: &str, ctx: &mut MappingContext) -> TargetType {
        match self.driver.lookup(source_type) {
            Some(target) => target,
            None => {
                ctx.warn(format!(
                    "The original type '{}' is not convertible into any supported type, using STRING",
                    source_type
                ));
                TargetType::String
            }
        }
    }
}
