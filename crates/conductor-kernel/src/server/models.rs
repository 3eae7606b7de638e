//! `listModels` RPC method implementation.

use super::KernelState;
use crate::rpc::ModelInfo;

impl KernelState {
    pub(super) fn list_models_impl(&self) -> Vec<ModelInfo> {
        self.models.clone()
    }
}
