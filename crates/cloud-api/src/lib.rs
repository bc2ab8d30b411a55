//! Thin client for a Firestore-compatible REST document API.
//!
//! Only the calls the sync engine needs are exposed: enumerate a collection,
//! add a document with a server-assigned id, delete a document, and get/set a
//! single named document.

pub mod value;

use serde::Deserialize;
use serde_json::{json, Map, Value};

pub const DEFAULT_API_URL: &str = "https://firestore.googleapis.com/v1";

/// Page size used when enumerating collections
const LIST_PAGE_SIZE: u32 = 300;

#[derive(Clone, Debug)]
pub struct RequestConfig {
	pub client: reqwest::Client,
	pub api_url: String,
	pub project_id: String,
	pub api_key: Option<String>,
}

impl RequestConfig {
	pub fn new(project_id: impl Into<String>, api_key: Option<String>) -> Self {
		Self {
			client: reqwest::Client::new(),
			api_url: DEFAULT_API_URL.to_string(),
			project_id: project_id.into(),
			api_key,
		}
	}

	/// Root of the default database's document tree
	pub fn documents_url(&self) -> String {
		format!(
			"{}/projects/{}/databases/(default)/documents",
			self.api_url.trim_end_matches('/'),
			self.project_id
		)
	}

	pub fn collection_url(&self, collection: &str) -> String {
		format!("{}/{collection}", self.documents_url())
	}

	pub fn document_url(&self, collection: &str, id: &str) -> String {
		format!("{}/{collection}/{id}", self.documents_url())
	}

	/// URL for a fully qualified resource name as returned by the server
	pub fn resource_url(&self, name: &str) -> String {
		format!("{}/{name}", self.api_url.trim_end_matches('/'))
	}
}

#[derive(thiserror::Error, Debug)]
#[error("{0}")]
pub struct Error(pub String);

impl From<reqwest::Error> for Error {
	fn from(e: reqwest::Error) -> Self {
		Self(e.to_string())
	}
}

/// A decoded document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
	/// Fully qualified resource name
	pub name: String,
	pub fields: Map<String, Value>,
}

impl Document {
	/// The last path segment of the resource name
	pub fn id(&self) -> &str {
		self.name.rsplit('/').next().unwrap_or(&self.name)
	}
}

#[derive(Deserialize)]
struct RawDocument {
	name: String,
	#[serde(default)]
	fields: Map<String, Value>,
}

impl TryFrom<RawDocument> for Document {
	type Error = Error;

	fn try_from(raw: RawDocument) -> Result<Self, Self::Error> {
		Ok(Self {
			fields: value::decode_fields(&raw.fields)?,
			name: raw.name,
		})
	}
}

trait WithKey {
	fn with_key(self, key: Option<&str>) -> Self;
}

impl WithKey for reqwest::RequestBuilder {
	fn with_key(self, key: Option<&str>) -> Self {
		match key {
			Some(key) => self.query(&[("key", key)]),
			None => self,
		}
	}
}

pub mod documents {
	use super::*;

	pub use list::exec as list;
	pub mod list {
		use super::*;

		#[derive(Deserialize)]
		#[serde(rename_all = "camelCase")]
		struct Response {
			#[serde(default)]
			documents: Vec<RawDocument>,
			next_page_token: Option<String>,
		}

		/// Fetch every document of a collection, following pagination.
		pub async fn exec(config: &RequestConfig, collection: &str) -> Result<Vec<Document>, Error> {
			let mut out = Vec::new();
			let mut page_token = None::<String>;

			loop {
				let mut req = config
					.client
					.get(config.collection_url(collection))
					.query(&[("pageSize", LIST_PAGE_SIZE.to_string())])
					.with_key(config.api_key.as_deref());

				if let Some(token) = &page_token {
					req = req.query(&[("pageToken", token)]);
				}

				let page: Response = req.send().await?.error_for_status()?.json().await?;

				for raw in page.documents {
					out.push(Document::try_from(raw)?);
				}

				match page.next_page_token {
					Some(token) if !token.is_empty() => page_token = Some(token),
					_ => break,
				}
			}

			Ok(out)
		}
	}

	pub use add::exec as add;
	pub mod add {
		use super::*;

		/// Create a document with a server-assigned id.
		pub async fn exec(
			config: &RequestConfig,
			collection: &str,
			fields: &Map<String, Value>,
		) -> Result<Document, Error> {
			let raw: RawDocument = config
				.client
				.post(config.collection_url(collection))
				.with_key(config.api_key.as_deref())
				.json(&json!({ "fields": value::encode_fields(fields) }))
				.send()
				.await?
				.error_for_status()?
				.json()
				.await?;

			Document::try_from(raw)
		}
	}

	pub use delete::exec as delete;
	pub mod delete {
		use super::*;

		/// Delete a document by its fully qualified resource name.
		pub async fn exec(config: &RequestConfig, name: &str) -> Result<(), Error> {
			config
				.client
				.delete(config.resource_url(name))
				.with_key(config.api_key.as_deref())
				.send()
				.await?
				.error_for_status()
				.map(|_| ())
				.map_err(Into::into)
		}
	}

	pub use get::exec as get;
	pub mod get {
		use super::*;

		pub async fn exec(
			config: &RequestConfig,
			collection: &str,
			id: &str,
		) -> Result<Option<Document>, Error> {
			let res = config
				.client
				.get(config.document_url(collection, id))
				.with_key(config.api_key.as_deref())
				.send()
				.await?;

			if res.status() == reqwest::StatusCode::NOT_FOUND {
				return Ok(None);
			}

			let raw: RawDocument = res.error_for_status()?.json().await?;
			Document::try_from(raw).map(Some)
		}
	}

	pub use set::exec as set;
	pub mod set {
		use super::*;

		/// Create or fully overwrite a named document.
		///
		/// A PATCH without an update mask replaces every field of the document.
		pub async fn exec(
			config: &RequestConfig,
			collection: &str,
			id: &str,
			fields: &Map<String, Value>,
		) -> Result<(), Error> {
			config
				.client
				.patch(config.document_url(collection, id))
				.with_key(config.api_key.as_deref())
				.json(&json!({ "fields": value::encode_fields(fields) }))
				.send()
				.await?
				.error_for_status()
				.map(|_| ())
				.map_err(Into::into)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builds_resource_urls() {
		let mut config = RequestConfig::new("grades-demo", None);
		config.api_url = "http://localhost:8080/v1/".to_string();

		assert_eq!(
			config.collection_url("students"),
			"http://localhost:8080/v1/projects/grades-demo/databases/(default)/documents/students"
		);
		assert_eq!(
			config.document_url("settings", "hps"),
			"http://localhost:8080/v1/projects/grades-demo/databases/(default)/documents/settings/hps"
		);
		assert_eq!(
			config.resource_url("projects/grades-demo/databases/(default)/documents/students/x1"),
			"http://localhost:8080/v1/projects/grades-demo/databases/(default)/documents/students/x1"
		);
	}

	#[test]
	fn decodes_raw_documents() {
		let raw: RawDocument = serde_json::from_value(json!({
			"name": "projects/p/databases/(default)/documents/grades/AbC123",
			"fields": {
				"id": { "stringValue": "s1_c1" },
				"score": { "integerValue": "97" }
			},
			"createTime": "2024-01-02T00:00:00Z"
		}))
		.unwrap();

		let doc = Document::try_from(raw).unwrap();
		assert_eq!(doc.id(), "AbC123");
		assert_eq!(doc.fields["id"], json!("s1_c1"));
		assert_eq!(doc.fields["score"], json!(97));
	}

	#[test]
	fn documents_without_fields_decode_empty() {
		let raw: RawDocument = serde_json::from_value(json!({
			"name": "projects/p/databases/(default)/documents/settings/hps"
		}))
		.unwrap();

		assert!(Document::try_from(raw).unwrap().fields.is_empty());
	}
}
