//! Embedded LanceDB adapter.
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, UInt32Type, UInt64Type};
use arrow_array::{Array, FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, UInt32Array, UInt64Array};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType, Table};
use tracing::{debug, info};

use minirag_core::error::{ensure_dimension, with_timeout};
use minirag_core::traits::VectorStore;
use minirag_core::types::{Chunk, ChunkId, IndexedRecord, Neighbor};
use minirag_core::{Error, Result};

use crate::schema::{self, build_arrow_schema, vector_width};

const SERVICE: &str = "lancedb";

fn lance_err(e: lancedb::Error) -> Error { Error::VectorStore(format!("lancedb: {e}")) }

fn arrow_err(e: arrow_schema::ArrowError) -> Error { Error::VectorStore(format!("arrow: {e}")) }

pub struct LanceVectorStore {
	db: Connection,
	table_name: String,
	dim: usize,
	timeout: Duration,
}

impl LanceVectorStore {
	/// Open (creating if needed) `table_name` under `db_path`. An existing table
	/// whose vector column has a different width is a dimension mismatch.
	pub async fn open(db_path: &Path, table_name: &str, dim: usize, timeout: Duration) -> Result<Self> {
		let db = connect(db_path.to_string_lossy().as_ref()).execute().await.map_err(lance_err)?;
		let store = Self { db, table_name: table_name.to_string(), dim, timeout };
		store.ensure_table().await?;
		info!(path = %db_path.display(), table = table_name, dim, "opened LanceDB store");
		Ok(store)
	}

	async fn ensure_table(&self) -> Result<()> {
		let names = self.db.table_names().execute().await.map_err(lance_err)?;
		if names.contains(&self.table_name) {
			let table = self.table().await?;
			let schema = table.schema().await.map_err(lance_err)?;
			let width = vector_width(&schema).ok_or_else(|| Error::VectorStore(format!("table {} has no vector column", self.table_name)))?;
			return ensure_dimension(self.dim, width);
		}
		// create empty table with 0 rows
		let schema = build_arrow_schema(self.dim);
		let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
		self.db.create_table(&self.table_name, Box::new(iter)).execute().await.map_err(lance_err)?;
		Ok(())
	}

	async fn table(&self) -> Result<Table> { self.db.open_table(&self.table_name).execute().await.map_err(lance_err) }

	fn records_to_batch(&self, records: &[IndexedRecord]) -> Result<RecordBatch> {
		let vectors = records.iter().map(|r| Some(r.vector.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
		RecordBatch::try_new(
			build_arrow_schema(self.dim),
			vec![
				Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.chunk.id.as_str()))),
				Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.chunk.source.as_str()))),
				Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.chunk.text.as_str()))),
				Arc::new(UInt64Array::from_iter_values(records.iter().map(|r| r.chunk.index as u64))),
				Arc::new(UInt64Array::from_iter_values(records.iter().map(|r| r.chunk.start as u64))),
				Arc::new(UInt64Array::from_iter_values(records.iter().map(|r| r.chunk.end as u64))),
				Arc::new(UInt32Array::from_iter(records.iter().map(|r| r.chunk.page))),
				Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, self.dim as i32)),
			],
		)
		.map_err(arrow_err)
	}
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Arc<dyn Array>> {
	batch.column_by_name(name).ok_or_else(|| Error::VectorStore(format!("result is missing column {name}")))
}

fn strings<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	column(batch, name)?.as_string_opt::<i32>().ok_or_else(|| Error::VectorStore(format!("column {name} is not utf8")))
}

fn u64s<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt64Array> {
	column(batch, name)?.as_primitive_opt::<UInt64Type>().ok_or_else(|| Error::VectorStore(format!("column {name} is not u64")))
}

/// Decode one result batch into neighbours. Cosine distance becomes similarity `1 - d`.
fn batch_to_neighbors(batch: &RecordBatch) -> Result<Vec<Neighbor>> {
	let ids = strings(batch, schema::ID)?;
	let sources = strings(batch, schema::SOURCE)?;
	let texts = strings(batch, schema::TEXT)?;
	let indices = u64s(batch, schema::CHUNK_INDEX)?;
	let starts = u64s(batch, schema::START)?;
	let ends = u64s(batch, schema::END)?;
	let pages = column(batch, schema::PAGE)?
		.as_primitive_opt::<UInt32Type>()
		.ok_or_else(|| Error::VectorStore("column page is not u32".into()))?;
	let vectors = column(batch, schema::VECTOR)?
		.as_fixed_size_list_opt()
		.ok_or_else(|| Error::VectorStore("column vector is not a fixed size list".into()))?;
	let distances = batch.column_by_name("_distance").and_then(|c| c.as_primitive_opt::<Float32Type>());

	let mut out = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		let list = vectors.value(i);
		let vector = list
			.as_primitive_opt::<Float32Type>()
			.ok_or_else(|| Error::VectorStore("vector items are not f32".into()))?
			.values()
			.to_vec();
		let chunk = Chunk {
			id: ids.value(i).to_string(),
			source: sources.value(i).to_string(),
			text: texts.value(i).to_string(),
			index: indices.value(i) as usize,
			start: starts.value(i) as usize,
			end: ends.value(i) as usize,
			page: if pages.is_null(i) { None } else { Some(pages.value(i)) },
		};
		let score = distances.map(|d| 1.0 - d.value(i)).unwrap_or(0.0);
		out.push(Neighbor { chunk, vector, score });
	}
	Ok(out)
}

fn quote(id: &str) -> String { format!("'{}'", id.replace('\'', "''")) }

#[async_trait]
impl VectorStore for LanceVectorStore {
	fn dim(&self) -> usize { self.dim }

	async fn upsert(&self, records: &[IndexedRecord]) -> Result<()> {
		if records.is_empty() { return Ok(()); }
		for r in records {
			ensure_dimension(r.vector.len(), self.dim)?;
		}
		let batch = self.records_to_batch(records)?;
		let schema = batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
		with_timeout(SERVICE, self.timeout, async {
			let table = self.table().await?;
			// Upsert behavior via merge_insert: id is unique
			let mut mi = table.merge_insert(&[schema::ID]);
			mi.when_matched_update_all(None).when_not_matched_insert_all();
			mi.execute(reader).await.map_err(lance_err)?;
			Ok(())
		})
		.await?;
		debug!(table = %self.table_name, records = records.len(), "upserted records");
		Ok(())
	}

	async fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<Neighbor>> {
		ensure_dimension(query.len(), self.dim)?;
		if limit == 0 { return Ok(Vec::new()); }
		with_timeout(SERVICE, self.timeout, async {
			let table = self.table().await?;
			let mut stream = table
				.vector_search(query.to_vec())
				.map_err(lance_err)?
				.distance_type(DistanceType::Cosine)
				.limit(limit)
				.execute()
				.await
				.map_err(lance_err)?;
			let mut hits = Vec::new();
			while let Some(batch) = stream.try_next().await.map_err(lance_err)? {
				hits.extend(batch_to_neighbors(&batch)?);
			}
			hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
			hits.truncate(limit);
			Ok(hits)
		})
		.await
	}

	async fn delete(&self, ids: &[ChunkId]) -> Result<()> {
		if ids.is_empty() { return Ok(()); }
		let filter = format!("{} IN ({})", schema::ID, ids.iter().map(|id| quote(id)).collect::<Vec<_>>().join(", "));
		with_timeout(SERVICE, self.timeout, async {
			self.table().await?.delete(&filter).await.map_err(lance_err)?;
			Ok(())
		})
		.await
	}

	async fn count(&self) -> Result<usize> {
		with_timeout(SERVICE, self.timeout, async { self.table().await?.count_rows(None).await.map_err(lance_err) }).await
	}
}
