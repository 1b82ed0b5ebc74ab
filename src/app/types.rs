use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u64 = 50;
pub const LIMIT_CHOICES: [u64; 4] = [25, 50, 100, 200];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub detector_id: Option<String>,
    pub model_label: Option<String>,
    pub model_confidence: Option<f64>,
    pub result_type: Option<String>,
    pub status: Option<String>,
    pub count: Option<i64>,
    pub received_ts: Option<String>,
    pub updated_ts: Option<String>,
    pub human_label: Option<String>,
    pub human_confidence: Option<f64>,
    pub human_user: Option<String>,
    pub human_notes: Option<String>,
    pub human_labeled_at: Option<String>,
    pub image_uri: Option<String>,
}

impl QueueItem {
    pub fn is_pending(&self) -> bool {
        self.human_label.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct QueuePage {
    pub items: Vec<QueueItem>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub pending_only: bool,
    pub detector_id: Option<String>,
    pub limit: u64,
    pub offset: u64,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            pending_only: true,
            detector_id: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Filter {
    pub fn new(pending_only: bool, detector_id: Option<String>, limit: u64, offset: u64) -> Self {
        Self {
            pending_only,
            detector_id: detector_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            limit: limit.max(1),
            offset,
        }
    }

    pub fn with_offset(&self, offset: u64) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("pending_only", self.pending_only.to_string()),
        ];
        if let Some(detector_id) = &self.detector_id {
            pairs.push(("detector_id", detector_id.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelSubmission {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}
