//! The runtime host seam.

use std::sync::Arc;

use async_trait::async_trait;

use crate::capability::EngineInstance;
use crate::error::Result;
use crate::fetch::ModuleBinary;
use crate::readiness::ReadinessHook;

/// Instantiates an engine module and starts its entry point.
///
/// The host wires `ready` to the module's readiness notification. The
/// returned instance is not usable until that notification fires; the host
/// must not wait for it.
#[async_trait]
pub trait RuntimeHost: Send + Sync {
    async fn launch(
        &self,
        binary: ModuleBinary,
        ready: ReadinessHook,
    ) -> Result<Arc<dyn EngineInstance>>;
}

#[async_trait]
impl<H: RuntimeHost + ?Sized> RuntimeHost for Arc<H> {
    async fn launch(
        &self,
        binary: ModuleBinary,
        ready: ReadinessHook,
    ) -> Result<Arc<dyn EngineInstance>> {
        (**self).launch(binary, ready).await
    }
}
