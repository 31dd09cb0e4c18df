//! Mapping configuration document.
//!
//! [`ConfigDocument`] mirrors the JSON/YAML shape field for field, every
//! field optional, so that a missing mandatory field can be reported with
//! its name and owning class instead of a bare parse error.
//! [`ConfigDocument::validate`] turns it into the typed
//! [`MappingConfiguration`] consumed by the applier.

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{MappingError, Result};
use crate::pipeline::MappingContext;
use crate::resolver::TargetType;
use crate::schema_model::Direction;

// ---------------------------------------------------------------------------
// Document shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertices: Option<Vec<VertexDocument>>,
    /// Each entry holds exactly one key: the edge class name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<IndexMap<String, EdgeDocument>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<VertexMappingDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, PropertyDocument>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexMappingDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_tables: Option<Vec<SourceTableDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_function: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTableDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<bool>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_null: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<PropertyMappingDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMappingDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<Vec<EdgeMappingDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, PropertyDocument>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeMappingDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_table: Option<JoinTableDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTableDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_columns: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Validated configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingConfiguration {
    pub vertices: Vec<ConfiguredVertexClass>,
    pub edges: Vec<ConfiguredEdgeClass>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfiguredVertexClass {
    pub name: String,
    pub source_tables: Vec<SourceTable>,
    pub aggregation_function: Option<String>,
    /// Document order
    pub properties: Vec<ConfiguredProperty>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    /// Source id referenced by property mappings, e.g. `hr_EMPLOYEE`
    pub source_id: String,
    pub table_name: String,
    pub data_source: String,
    pub aggregation_columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfiguredProperty {
    pub name: String,
    pub include: bool,
    pub target_type: TargetType,
    pub mandatory: bool,
    pub read_only: bool,
    pub not_null: bool,
    pub mapping: Option<PropertyMapping>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMapping {
    pub source_id: String,
    pub column_name: String,
    pub column_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfiguredEdgeClass {
    pub name: String,
    pub mappings: Vec<EdgeMapping>,
    pub properties: Vec<ConfiguredProperty>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMapping {
    pub from_table: String,
    pub to_table: String,
    pub from_columns: Vec<String>,
    pub to_columns: Vec<String>,
    pub direction: Option<Direction>,
    pub join_table: Option<JoinTableMapping>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinTableMapping {
    pub table_name: String,
    /// Join-table columns referencing `from_table`
    pub from_columns: Vec<String>,
    /// Join-table columns referencing `to_table`
    pub to_columns: Vec<String>,
}

impl SourceTable {
    pub fn new(data_source: &str, table_name: &str) -> Self {
        Self {
            source_id: format!("{}_{}", data_source, table_name),
            table_name: table_name.to_string(),
            data_source: data_source.to_string(),
            aggregation_columns: None,
        }
    }
}

impl MappingConfiguration {
    /// Join tables named by any edge mapping
    pub fn join_tables(&self) -> Vec<String> {
        self.edges
            .iter()
            .flat_map(|e| e.mappings.iter())
            .filter_map(|m| m.join_table.as_ref().map(|j| j.table_name.clone()))
            .collect()
    }

    pub fn vertex_class(&self, name: &str) -> Option<&ConfiguredVertexClass> {
        self.vertices.iter().find(|v| v.name == name)
    }

    pub fn edge_class(&self, name: &str) -> Option<&ConfiguredEdgeClass> {
        self.edges.iter().find(|e| e.name == name)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ConfigDocument {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MappingError::ConfigParse {
            error: e.to_string(),
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| MappingError::ConfigParse {
            error: e.to_string(),
        })
    }

    /// Load by extension: `.yaml`/`.yml` is YAML, anything else JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| MappingError::ConfigRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let parsed = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content),
        };
        parsed.map_err(|e| {
            MappingError::config_error_with_context(path.display().to_string(), e.to_string())
        })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| MappingError::ConfigParse {
            error: e.to_string(),
        })
    }

    /// Check mandatory fields and convert into the typed configuration.
    ///
    /// Properties whose `type` is missing or unknown are dropped with a
    /// warning; every other defect is fatal.
    pub fn validate(&self, ctx: &mut MappingContext) -> Result<MappingConfiguration> {
        let vertex_docs = self
            .vertices
            .as_ref()
            .ok_or_else(|| MappingError::missing_field("vertices", "configuration"))?;
        let edge_docs = self
            .edges
            .as_ref()
            .ok_or_else(|| MappingError::missing_field("edges", "configuration"))?;

        let mut vertices = Vec::with_capacity(vertex_docs.len());
        for doc in vertex_docs {
            vertices.push(validate_vertex(doc, ctx)?);
        }
        let mut edges = Vec::with_capacity(edge_docs.len());
        for entry in edge_docs {
            edges.push(validate_edge(entry, ctx)?);
        }

        debug!(
            "Configuration validated: {} vertex classes, {} edge classes",
            vertices.len(),
            edges.len()
        );
        Ok(MappingConfiguration { vertices, edges })
    }
}

fn required<T: Clone>(value: &Option<T>, field: &str, class: &str) -> Result<T> {
    value
        .clone()
        .ok_or_else(|| MappingError::missing_field(field, class))
}

fn validate_vertex(doc: &VertexDocument, ctx: &mut MappingContext) -> Result<ConfiguredVertexClass> {
    let name = required(&doc.name, "name", "vertex class")?;
    let mapping = doc
        .mapping
        .as_ref()
        .ok_or_else(|| MappingError::missing_field("mapping", &name))?;
    let table_docs = mapping
        .source_tables
        .as_ref()
        .ok_or_else(|| MappingError::missing_field("sourceTables", &name))?;
    if table_docs.is_empty() {
        return Err(MappingError::invalid_value("sourceTables", "[]", &name));
    }

    let mut source_tables = Vec::with_capacity(table_docs.len());
    for table in table_docs {
        let aggregation_columns = table.aggregation_columns.clone();
        if mapping.aggregation_function.is_some() && aggregation_columns.is_none() {
            return Err(MappingError::missing_field("aggregationColumns", &name));
        }
        source_tables.push(SourceTable {
            source_id: required(&table.name, "name", &name)?,
            table_name: required(&table.table_name, "tableName", &name)?,
            data_source: required(&table.data_source, "dataSource", &name)?,
            aggregation_columns,
        });
    }

    let properties = validate_properties(doc.properties.as_ref(), &name, ctx)?;
    Ok(ConfiguredVertexClass {
        name,
        source_tables,
        aggregation_function: mapping.aggregation_function.clone(),
        properties,
    })
}

fn validate_edge(
    entry: &IndexMap<String, EdgeDocument>,
    ctx: &mut MappingContext,
) -> Result<ConfiguredEdgeClass> {
    let (name, body) = match entry.len() {
        1 => entry
            .first()
            .map(|(n, b)| (n.clone(), b))
            .ok_or_else(|| MappingError::missing_field("name", "edge class"))?,
        _ => {
            let keys: Vec<&str> = entry.keys().map(String::as_str).collect();
            return Err(MappingError::invalid_value(
                "edge definition",
                keys.join(", "),
                "edges",
            ));
        }
    };

    let mapping_docs = body
        .mapping
        .as_ref()
        .ok_or_else(|| MappingError::missing_field("mapping", &name))?;
    let mut mappings = Vec::with_capacity(mapping_docs.len());
    for doc in mapping_docs {
        let direction = match &doc.direction {
            Some(raw) => Some(
                raw.parse::<Direction>()
                    .map_err(|_| MappingError::invalid_value("direction", raw.as_str(), &name))?,
            ),
            None => None,
        };
        let join_table = match &doc.join_table {
            Some(join) => Some(JoinTableMapping {
                table_name: required(&join.table_name, "tableName", &name)?,
                from_columns: required(&join.from_columns, "fromColumns", &name)?,
                to_columns: required(&join.to_columns, "toColumns", &name)?,
            }),
            None => None,
        };
        mappings.push(EdgeMapping {
            from_table: required(&doc.from_table, "fromTable", &name)?,
            to_table: required(&doc.to_table, "toTable", &name)?,
            from_columns: required(&doc.from_columns, "fromColumns", &name)?,
            to_columns: required(&doc.to_columns, "toColumns", &name)?,
            direction,
            join_table,
        });
    }

    let properties = validate_properties(body.properties.as_ref(), &name, ctx)?;
    Ok(ConfiguredEdgeClass {
        name,
        mappings,
        properties,
    })
}

fn validate_properties(
    docs: Option<&IndexMap<String, PropertyDocument>>,
    class: &str,
    ctx: &mut MappingContext,
) -> Result<Vec<ConfiguredProperty>> {
    let Some(docs) = docs else {
        return Ok(Vec::new());
    };
    let mut properties = Vec::with_capacity(docs.len());
    for (name, doc) in docs {
        let include = required(&doc.include, "include", class)?;
        let target_type = match doc.property_type.as_deref().map(str::parse::<TargetType>) {
            Some(Ok(t)) => t,
            _ => {
                ctx.warn(format!(
                    "Configuration ERROR: the property {} will not be added to the class {} \
                     because the type is badly defined or not defined at all.",
                    name, class
                ));
                continue;
            }
        };
        let mapping = match &doc.mapping {
            Some(m) => Some(PropertyMapping {
                source_id: required(&m.source, "source", class)?,
                column_name: required(&m.column_name, "columnName", class)?,
                column_type: required(&m.column_type, "type", class)?,
            }),
            None => None,
        };
        properties.push(ConfiguredProperty {
            name: name.clone(),
            include,
            target_type,
            mandatory: required(&doc.mandatory, "mandatory", class)?,
            read_only: required(&doc.read_only, "readOnly", class)?,
            not_null: required(&doc.not_null, "notNull", class)?,
            mapping,
        });
    }
    Ok(properties)
}

// ---------------------------------------------------------------------------
// Back to the document shape
// ---------------------------------------------------------------------------

impl From<&MappingConfiguration> for ConfigDocument {
    fn from(config: &MappingConfiguration) -> Self {
        let vertices = config
            .vertices
            .iter()
            .map(|v| VertexDocument {
                name: Some(v.name.clone()),
                mapping: Some(VertexMappingDocument {
                    source_tables: Some(
                        v.source_tables
                            .iter()
                            .map(|t| SourceTableDocument {
                                name: Some(t.source_id.clone()),
                                table_name: Some(t.table_name.clone()),
                                data_source: Some(t.data_source.clone()),
                                aggregation_columns: t.aggregation_columns.clone(),
                            })
                            .collect(),
                    ),
                    aggregation_function: v.aggregation_function.clone(),
                }),
                properties: Some(properties_document(&v.properties)),
            })
            .collect();

        let edges = config
            .edges
            .iter()
            .map(|e| {
                let mut entry = IndexMap::new();
                entry.insert(
                    e.name.clone(),
                    EdgeDocument {
                        mapping: Some(e.mappings.iter().map(edge_mapping_document).collect()),
                        properties: Some(properties_document(&e.properties)),
                    },
                );
                entry
            })
            .collect();

        ConfigDocument {
            vertices: Some(vertices),
            edges: Some(edges),
        }
    }
}

fn properties_document(properties: &[ConfiguredProperty]) -> IndexMap<String, PropertyDocument> {
    properties
        .iter()
        .map(|p| {
            (
                p.name.clone(),
                PropertyDocument {
                    include: Some(p.include),
                    property_type: Some(p.target_type.as_str().to_string()),
                    mandatory: Some(p.mandatory),
                    read_only: Some(p.read_only),
                    not_null: Some(p.not_null),
                    mapping: p.mapping.as_ref().map(|m| PropertyMappingDocument {
                        source: Some(m.source_id.clone()),
                        column_name: Some(m.column_name.clone()),
                        column_type: Some(m.column_type.clone()),
                    }),
                },
            )
        })
        .collect()
}

fn edge_mapping_document(mapping: &EdgeMapping) -> EdgeMappingDocument {
    EdgeMappingDocument {
        from_table: Some(mapping.from_table.clone()),
        to_table: Some(mapping.to_table.clone()),
        from_columns: Some(mapping.from_columns.clone()),
        to_columns: Some(mapping.to_columns.clone()),
        direction: mapping.direction.map(|d| d.as_str().to_string()),
        join_table: mapping.join_table.as_ref().map(|j| JoinTableDocument {
            table_name: Some(j.table_name.clone()),
            from_columns: Some(j.from_columns.clone()),
            to_columns: Some(j.to_columns.clone()),
        }),
    }
}
