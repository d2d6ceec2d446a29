use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const ID: &str = "id";
pub const SOURCE: &str = "source";
pub const TEXT: &str = "text";
pub const CHUNK_INDEX: &str = "chunk_index";
pub const START: &str = "start";
pub const END: &str = "end";
pub const PAGE: &str = "page";
pub const VECTOR: &str = "vector";

pub fn build_arrow_schema(dim: usize) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(ID, DataType::Utf8, false),
		Field::new(SOURCE, DataType::Utf8, false),
		Field::new(TEXT, DataType::Utf8, false),
		Field::new(CHUNK_INDEX, DataType::UInt64, false),
		Field::new(START, DataType::UInt64, false),
		Field::new(END, DataType::UInt64, false),
		Field::new(PAGE, DataType::UInt32, true),
		Field::new(VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32), true),
	]))
}

/// Width of the `vector` column of an existing table, if it has one.
pub fn vector_width(schema: &Schema) -> Option<usize> {
	match schema.field_with_name(VECTOR).ok()?.data_type() {
		DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn width_is_read_back_from_schema() {
		assert_eq!(vector_width(&build_arrow_schema(768)), Some(768));
		assert_eq!(vector_width(&Schema::new(vec![Field::new(ID, DataType::Utf8, false)])), None);
	}
}
