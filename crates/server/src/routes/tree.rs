use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::person::Person;
use forest::{Forest, TreeNode};
use serde::Serialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
pub struct TreeStats {
    pub members: usize,
    pub roots: usize,
    /// Length of the longest root-to-leaf line.
    pub generations: usize,
}

impl TreeStats {
    pub fn of(forest: &Forest<Person>) -> Self {
        Self {
            members: forest.count(),
            roots: forest.roots().len(),
            generations: forest
                .roots()
                .iter()
                .map(|root| generations(root))
                .max()
                .unwrap_or(0),
        }
    }
}

fn generations(node: &TreeNode<Person>) -> usize {
    1 + node
        .children
        .iter()
        .map(|child| generations(child))
        .max()
        .unwrap_or(0)
}

/// GET /api/tree
pub async fn get_tree(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Forest<Person>>>, ApiError> {
    let forest = state.family().forest().await?;
    Ok(ResponseJson(ApiResponse::success(forest)))
}

/// GET /api/tree/stats
pub async fn get_tree_stats(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<TreeStats>>, ApiError> {
    let forest = state.family().forest().await?;
    Ok(ResponseJson(ApiResponse::success(TreeStats::of(&forest))))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/tree", get(get_tree))
        .route("/tree/stats", get(get_tree_stats))
}
