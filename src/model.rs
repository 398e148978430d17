use serde::{Deserialize, Serialize};

/// Name of the implicit primary key column shared by all entity types.
pub const PRIMARY_KEY: &str = "id";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Boolean,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub nullable: bool,
}

/// A field holding the primary key of a row in another (or the same) entity type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub field: String,
    pub references: String,
    #[serde(default)]
    pub nullable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityType {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
}

impl EntityType {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn column<T: Into<String>>(mut self, name: T, column_type: ColumnType) -> Self {
        self.columns.push(Column {
            name: name.into(),
            column_type,
            nullable: false,
        });
        self
    }

    pub fn nullable_column<T: Into<String>>(mut self, name: T, column_type: ColumnType) -> Self {
        self.columns.push(Column {
            name: name.into(),
            column_type,
            nullable: true,
        });
        self
    }

    pub fn foreign_key<F: Into<String>, R: Into<String>>(mut self, field: F, references: R) -> Self {
        self.foreign_keys.push(ForeignKey {
            field: field.into(),
            references: references.into(),
            nullable: false,
        });
        self
    }

    pub fn optional_foreign_key<F: Into<String>, R: Into<String>>(
        mut self,
        field: F,
        references: R,
    ) -> Self {
        self.foreign_keys.push(ForeignKey {
            field: field.into(),
            references: references.into(),
            nullable: true,
        });
        self
    }

    /// Declares a secondary index. Column names are logical field names; a
    /// foreign-key field name resolves to its physical key column.
    pub fn index<I, T>(mut self, columns: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.indexes.push(IndexDef {
            columns: columns.into_iter().map(Into::into).collect(),
            unique,
        });
        self
    }

    /// Foreign keys pointing at a different entity type.
    pub fn external_references(&self) -> impl Iterator<Item = &ForeignKey> {
        self.foreign_keys
            .iter()
            .filter(move |fk| fk.references != self.name)
    }

    pub fn find_foreign_key(&self, field: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.field == field)
    }

    /// All logical field names in storage order, excluding the primary key.
    pub fn field_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.foreign_keys.iter().map(|fk| fk.field.as_str()))
            .collect()
    }
}
