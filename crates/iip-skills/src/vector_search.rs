//! Vector search over the legal corpus: OpenAI embeddings + Pinecone query, or an offline fixture.

use crate::http::{check_status, normalize_base, transport_error};
use iip_core::{ChatError, CoreConfig, IndexStats, LlmMode, Passage, Retriever};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SKILL_NAME: &str = "VectorSearch";

/// Offline corpus used in mock mode: (source, page, text).
const FIXTURE: &[(&str, &str, &str)] = &[
    (
        "bo-luat-lao-dong-2019.pdf",
        "54",
        "Điều 113. Nghỉ hằng năm. Người lao động làm việc đủ 12 tháng cho một người sử dụng lao động thì được nghỉ hằng năm, hưởng nguyên lương: 12 ngày làm việc đối với người làm công việc trong điều kiện bình thường.",
    ),
    (
        "bo-luat-lao-dong-2019.pdf",
        "20",
        "Điều 20. Loại hợp đồng lao động. Hợp đồng lao động phải được giao kết theo một trong các loại: hợp đồng lao động không xác định thời hạn; hợp đồng lao động xác định thời hạn không quá 36 tháng.",
    ),
    (
        "nghi-dinh-74-2024-nd-cp.pdf",
        "2",
        "Nghị định số 74/2024/NĐ-CP quy định mức lương tối thiểu vùng áp dụng đối với người lao động làm việc theo hợp đồng lao động từ ngày 01 tháng 7 năm 2024.",
    ),
    (
        "luat-bao-hiem-xa-hoi-2014.pdf",
        "12",
        "Điều 2. Đối tượng áp dụng. Người lao động là công dân Việt Nam thuộc đối tượng tham gia bảo hiểm xã hội bắt buộc khi làm việc theo hợp đồng lao động có thời hạn từ đủ 01 tháng trở lên.",
    ),
    (
        "danh-muc-khu-cong-nghiep-binh-duong.pdf",
        "3",
        "Khu công nghiệp Sóng Thần 1 tại thành phố Dĩ An, tỉnh Bình Dương, diện tích 180 ha, thành lập năm 1995, ngành nghề: dệt may, chế biến thực phẩm, cơ khí.",
    ),
    (
        "danh-muc-khu-cong-nghiep-binh-duong.pdf",
        "4",
        "Khu công nghiệp VSIP 1 tại thành phố Thuận An, tỉnh Bình Dương, diện tích 500 ha, chủ đầu tư Công ty TNHH Liên doanh Khu công nghiệp Việt Nam - Singapore.",
    ),
    (
        "quy-hoach-cum-cong-nghiep-bac-ninh.pdf",
        "7",
        "Cụm công nghiệp Đồng Nguyên tại thị xã Từ Sơn, tỉnh Bắc Ninh, diện tích 50 ha, ngành nghề sản xuất đồ gỗ mỹ nghệ.",
    ),
];

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    #[serde(default)]
    metadata: Option<serde_json::Map<String, Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeStatsResponse {
    #[serde(default)]
    dimension: u32,
    #[serde(default)]
    total_vector_count: u64,
}

/// Retriever backed by Pinecone (live) or by a keyword-ranked fixture (mock).
pub struct VectorSearch {
    mode: LlmMode,
    client: Client,
    openai_base_url: String,
    openai_api_key: Option<String>,
    embedding_model: String,
    index_host: Option<String>,
    pinecone_api_key: Option<String>,
    index_name: String,
    top_k: usize,
}

impl VectorSearch {
    pub fn mock(top_k: usize) -> Self {
        Self {
            mode: LlmMode::Mock,
            client: Client::new(),
            openai_base_url: String::new(),
            openai_api_key: None,
            embedding_model: String::new(),
            index_host: None,
            pinecone_api_key: None,
            index_name: "fixture".to_string(),
            top_k,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            mode: config.mode(),
            client: Client::new(),
            openai_base_url: normalize_base(&config.openai_base_url),
            openai_api_key: config.openai_api_key.clone(),
            embedding_model: config.embedding_model.clone(),
            index_host: config.pinecone_index_host.as_deref().map(normalize_base),
            pinecone_api_key: config.pinecone_api_key.clone(),
            index_name: config.pinecone_index_name.clone(),
            top_k: config.top_k,
        }
    }

    /// Ranks fixture passages by the number of query words they contain; ties keep corpus order.
    fn mock_search(&self, query: &str) -> Vec<Passage> {
        let lower = query.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric() && c != '/')
            .filter(|w| w.chars().count() >= 2)
            .collect();
        let mut scored: Vec<(usize, usize)> = FIXTURE
            .iter()
            .enumerate()
            .map(|(i, (_, _, text))| {
                let text = text.to_lowercase();
                (words.iter().filter(|w| text.contains(**w)).count(), i)
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, i)| {
                let (source, page, text) = FIXTURE[i];
                Passage {
                    content: text.to_string(),
                    source: source.to_string(),
                    page: Some(page.to_string()),
                }
            })
            .collect()
    }

    fn pinecone(&self) -> Result<(&str, &str), ChatError> {
        let host = self.index_host.as_deref().ok_or_else(|| {
            ChatError::UpstreamUnavailable("pinecone_index_host is not configured".to_string())
        })?;
        let key = self
            .pinecone_api_key
            .as_deref()
            .ok_or_else(|| ChatError::Auth("pinecone_api_key is not configured".to_string()))?;
        Ok((host, key))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ChatError> {
        let api_key = self
            .openai_api_key
            .as_deref()
            .ok_or_else(|| ChatError::Auth("openai_api_key is not configured".to_string()))?;
        let response = self
            .client
            .post(format!("{}/embeddings", self.openai_base_url))
            .bearer_auth(api_key)
            .json(&EmbeddingRequest {
                model: &self.embedding_model,
                input: text,
            })
            .send()
            .await
            .map_err(transport_error)?;
        let parsed: EmbeddingResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ChatError::Internal("embedding response was empty".to_string()))
    }

    async fn live_search(&self, query: &str) -> Result<Vec<Passage>, ChatError> {
        let (host, key) = self.pinecone()?;
        let vector = self.embed(query).await?;
        let response = self
            .client
            .post(format!("{}/query", host))
            .header("Api-Key", key)
            .json(&QueryRequest {
                vector: &vector,
                top_k: self.top_k,
                include_metadata: true,
            })
            .send()
            .await
            .map_err(transport_error)?;
        let parsed: QueryResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        Ok(passages_from_matches(parsed.matches))
    }

    async fn live_stats(&self) -> Result<IndexStats, ChatError> {
        let (host, key) = self.pinecone()?;
        let response = self
            .client
            .post(format!("{}/describe_index_stats", host))
            .header("Api-Key", key)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(transport_error)?;
        let parsed: DescribeStatsResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        Ok(IndexStats {
            name: self.index_name.clone(),
            total_vectors: parsed.total_vector_count,
            dimension: parsed.dimension,
            ready: parsed.total_vector_count > 0,
        })
    }
}

/// Matches without a `text` field are skipped; `page` may be numeric or a string.
fn passages_from_matches(matches: Vec<QueryMatch>) -> Vec<Passage> {
    matches
        .into_iter()
        .filter_map(|m| {
            let metadata = m.metadata?;
            let content = metadata.get("text")?.as_str()?.to_string();
            let source = metadata
                .get("source")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            let page = metadata.get("page").and_then(|p| match p {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
            Some(Passage {
                content,
                source,
                page,
            })
        })
        .collect()
}

#[async_trait::async_trait]
impl Retriever for VectorSearch {
    fn name(&self) -> &str {
        SKILL_NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<Passage>, ChatError> {
        let passages = match self.mode {
            LlmMode::Mock => self.mock_search(query),
            LlmMode::Live => self.live_search(query).await?,
        };
        tracing::debug!(
            target: "iip::skills",
            skill = SKILL_NAME,
            mode = ?self.mode,
            hits = passages.len(),
            "Search complete"
        );
        Ok(passages)
    }

    async fn stats(&self) -> Result<IndexStats, ChatError> {
        match self.mode {
            LlmMode::Mock => Ok(IndexStats {
                name: self.index_name.clone(),
                total_vectors: FIXTURE.len() as u64,
                dimension: 0,
                ready: true,
            }),
            LlmMode::Live => self.live_stats().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_ranks_by_overlap() {
        let search = VectorSearch::mock(3);
        let hits = search
            .search("Khu công nghiệp VSIP 1 ở Bình Dương có diện tích bao nhiêu?")
            .await
            .unwrap();
        assert!(!hits.is_empty());
        assert!(hits.len() <= 3);
        assert!(hits[0].content.contains("VSIP 1"));
        assert_eq!(hits[0].page.as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn test_mock_returns_empty_for_unrelated_query() {
        let search = VectorSearch::mock(5);
        assert!(search.search("zzz qqq").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_stats_report_fixture() {
        let stats = VectorSearch::mock(5).stats().await.unwrap();
        assert_eq!(stats.total_vectors, FIXTURE.len() as u64);
        assert!(stats.ready);
    }

    #[tokio::test]
    async fn test_live_without_host_is_unavailable() {
        let search = VectorSearch {
            mode: LlmMode::Live,
            openai_api_key: Some("sk-test".to_string()),
            ..VectorSearch::mock(5)
        };
        let err = search.search("luật lao động").await.unwrap_err();
        assert_eq!(err.category(), "upstream_unavailable");
    }

    #[test]
    fn test_query_request_wire_shape() {
        let vector = [0.1_f32, 0.2];
        let json = serde_json::to_value(QueryRequest {
            vector: &vector,
            top_k: 15,
            include_metadata: true,
        })
        .unwrap();
        assert_eq!(json["topK"], 15);
        assert_eq!(json["includeMetadata"], true);
    }

    #[test]
    fn test_matches_map_metadata() {
        let parsed: QueryResponse = serde_json::from_str(
            r#"{"matches":[
                {"id":"a","score":0.91,"metadata":{"text":"Điều 113","source":"blld.pdf","page":54}},
                {"id":"b","score":0.80,"metadata":{"source":"no-text.pdf"}},
                {"id":"c","score":0.75,"metadata":{"text":"Điều 20","page":"7"}}
            ],"namespace":""}"#,
        )
        .unwrap();
        let passages = passages_from_matches(parsed.matches);
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].page.as_deref(), Some("54"));
        assert_eq!(passages[1].source, "unknown");
        assert_eq!(passages[1].page.as_deref(), Some("7"));
    }

    #[test]
    fn test_describe_stats_parsing() {
        let parsed: DescribeStatsResponse = serde_json::from_str(
            r#"{"namespaces":{"":{"vectorCount":1200}},"dimension":3072,"indexFullness":0,"totalVectorCount":1200}"#,
        )
        .unwrap();
        assert_eq!(parsed.dimension, 3072);
        assert_eq!(parsed.total_vector_count, 1200);
    }
}
