//! Loading engine modules with Wasmtime.

use std::sync::Arc;

use async_trait::async_trait;
use wasmtime::{
    Caller, Config, Engine, Extern, Linker, Module, Store, StoreLimits, StoreLimitsBuilder,
};
use xray_editor_bootstrap::{
    BootstrapError, EngineInstance, ModuleBinary, ReadinessHook, RuntimeHost,
};

use crate::engine::{guest_slice, WasmEngine};
use crate::error::{HostError, Result};

/// Import module the host functions live in.
pub const HOST_MODULE: &str = "env";

/// Optional entry point export.
pub const ENTRY_POINT: &str = "_start";

/// Resource limits applied to every engine instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostConfig {
    /// Fuel granted to instantiation and to each capability call. `None`
    /// disables metering.
    pub fuel: Option<u64>,

    /// Upper bound on the size of any linear memory.
    pub max_memory_bytes: Option<usize>,
}

impl HostConfig {
    pub fn with_fuel(mut self, fuel: u64) -> Self {
        self.fuel = Some(fuel);
        self
    }

    pub fn with_max_memory(mut self, bytes: usize) -> Self {
        self.max_memory_bytes = Some(bytes);
        self
    }
}

/// State held by the Wasmtime store for each engine.
pub struct HostState {
    ready: ReadinessHook,
    limits: StoreLimits,
}

/// A [`RuntimeHost`] backed by Wasmtime.
///
/// The module is compiled and linked against two host functions,
/// `env.notify_ready` (wired to the readiness hook) and `env.log` (forwarded
/// to `tracing`). After instantiation `_start` runs if exported; engines may
/// also initialize from their start section.
#[derive(Clone)]
pub struct WasmHost {
    engine: Engine,
    config: HostConfig,
}

impl WasmHost {
    pub fn new(config: HostConfig) -> Result<Self> {
        let mut wasm_config = Config::new();
        wasm_config.consume_fuel(config.fuel.is_some());

        let engine = Engine::new(&wasm_config).map_err(|e| HostError::Engine(e.to_string()))?;
        Ok(Self { engine, config })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    fn linker(&self) -> Result<Linker<HostState>> {
        let mut linker = Linker::new(&self.engine);

        linker
            .func_wrap(
                HOST_MODULE,
                "notify_ready",
                |caller: Caller<'_, HostState>| {
                    if caller.data().ready.notify() {
                        tracing::info!("engine signalled ready");
                    } else {
                        tracing::debug!("ignoring repeated or detached readiness notification");
                    }
                },
            )
            .map_err(|e| HostError::Link(e.to_string()))?;

        linker
            .func_wrap(
                HOST_MODULE,
                "log",
                |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| {
                    let memory = caller.get_export("memory").and_then(Extern::into_memory);
                    let line = memory.and_then(|memory| {
                        guest_slice(memory.data(&caller), ptr as u32, len as u32)
                            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                    });
                    match line {
                        Some(line) => tracing::debug!(target: "xray_engine", "{line}"),
                        None => tracing::warn!(ptr, len, "engine log line out of bounds"),
                    }
                },
            )
            .map_err(|e| HostError::Link(e.to_string()))?;

        Ok(linker)
    }

    /// Compile, instantiate and start a module.
    ///
    /// Returns as soon as the entry point does. Whether the engine has
    /// signalled readiness by then is up to the engine.
    pub fn start(&self, bytes: &[u8], ready: ReadinessHook) -> Result<WasmEngine> {
        let module =
            Module::new(&self.engine, bytes).map_err(|e| HostError::Compile(e.to_string()))?;
        let linker = self.linker()?;

        let mut limits = StoreLimitsBuilder::new();
        if let Some(max) = self.config.max_memory_bytes {
            limits = limits.memory_size(max);
        }
        let state = HostState {
            ready,
            limits: limits.build(),
        };

        let mut store = Store::new(&self.engine, state);
        store.limiter(|state| &mut state.limits);
        refuel(&mut store, self.config.fuel)?;

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| HostError::Instantiate(e.to_string()))?;

        if let Some(entry) = instance.get_func(&mut store, ENTRY_POINT) {
            let entry = entry
                .typed::<(), ()>(&store)
                .map_err(|e| HostError::EntryPoint(e.to_string()))?;
            entry
                .call(&mut store, ())
                .map_err(|e| HostError::EntryPoint(e.to_string()))?;
        }

        tracing::debug!(
            imports = module.imports().len(),
            exports = module.exports().len(),
            "engine module started"
        );
        Ok(WasmEngine::new(store, instance, self.config.fuel))
    }
}

#[async_trait]
impl RuntimeHost for WasmHost {
    async fn launch(
        &self,
        binary: ModuleBinary,
        ready: ReadinessHook,
    ) -> xray_editor_bootstrap::Result<Arc<dyn EngineInstance>> {
        // Compilation and the entry point run on the blocking pool, off the
        // async workers.
        let host = self.clone();
        let engine = tokio::task::spawn_blocking(move || host.start(binary.as_bytes(), ready))
            .await
            .map_err(|e| {
                BootstrapError::instantiation(format!("engine start task failed: {e}"))
            })??;
        Ok(Arc::new(engine))
    }
}

/// Top the store up to the configured fuel.
pub(crate) fn refuel(store: &mut Store<HostState>, fuel: Option<u64>) -> Result<()> {
    if let Some(fuel) = fuel {
        store
            .set_fuel(fuel)
            .map_err(|e| HostError::Fuel(e.to_string()))?;
    }
    Ok(())
}
