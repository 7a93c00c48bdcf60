//! Field-name/type/length catalog for one record layout (spec.md §3).
//! Grounded on go-rdb's `record.Schema`.

use std::collections::HashMap;

use crate::error::{DbError, DbResult};
use crate::page::Page;

pub const INT_BYTE_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    String,
}

#[derive(Debug, Clone, Copy)]
struct FieldInfo {
    field_type: FieldType,
    length: usize,
}

/// An ordered list of (name, type, declared length) plus fast lookup by
/// name. Field order is insertion order, matching the slot layout derived
/// from it by `Layout`.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<String>,
    field_info: HashMap<String, FieldInfo>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    pub fn add_int_field(&mut self, field_name: impl Into<String>) {
        self.add_field(field_name, FieldType::Integer, 0);
    }

    pub fn add_string_field(&mut self, field_name: impl Into<String>, length: usize) {
        self.add_field(field_name, FieldType::String, length);
    }

    /// Copies one field's definition in from another schema.
    pub fn add(&mut self, field_name: &str, other: &Schema) -> DbResult<()> {
        let field_type = other.field_type(field_name)?;
        let length = other.length(field_name)?;
        self.add_field(field_name, field_type, length);
        Ok(())
    }

    pub fn has_field(&self, field_name: &str) -> bool {
        self.fields.iter().any(|f| f == field_name)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field_type(&self, field_name: &str) -> DbResult<FieldType> {
        Ok(self.info(field_name)?.field_type)
    }

    /// Declared length: 0 for Integer, the declared character count for
    /// String.
    pub fn length(&self, field_name: &str) -> DbResult<usize> {
        Ok(self.info(field_name)?.length)
    }

    /// Byte footprint of the field within a slot.
    pub fn length_in_bytes(&self, field_name: &str) -> DbResult<usize> {
        let info = self.info(field_name)?;
        Ok(match info.field_type {
            FieldType::Integer => INT_BYTE_SIZE,
            FieldType::String => Page::max_length(info.length),
        })
    }

    fn add_field(&mut self, field_name: impl Into<String>, field_type: FieldType, length: usize) {
        let field_name = field_name.into();
        self.fields.push(field_name.clone());
        self.field_info
            .insert(field_name, FieldInfo { field_type, length });
    }

    fn info(&self, field_name: &str) -> DbResult<FieldInfo> {
        self.field_info
            .get(field_name)
            .copied()
            .ok_or_else(|| DbError::Schema(format!("unknown field {}", field_name)))
    }
}
