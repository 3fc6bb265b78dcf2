//! A running engine and the string ABI used to call it.
//!
//! Strings cross the boundary through guest memory. To pass one in, the host
//! calls `alloc(len)`, copies the bytes to the returned pointer and releases
//! them with `dealloc(ptr, len)` after the call. Strings come back packed
//! into an `i64` as `(ptr << 32) | len`; a zero length is the empty string.
//! Returned buffers are released with `dealloc` once copied out. Engines
//! that do not export `dealloc` keep ownership of everything.

use std::sync::Mutex;

use wasmtime::{Instance, Memory, Store, TypedFunc, WasmParams, WasmResults};
use xray_editor_bootstrap::{Capability, CapabilityStatus, EngineError, EngineInstance};

use crate::error::{HostError, Result};
use crate::host::{refuel, HostState};

pub const MEMORY: &str = "memory";
pub const ALLOC: &str = "alloc";
pub const DEALLOC: &str = "dealloc";

/// Split a packed string return into `(ptr, len)`.
pub fn unpack(packed: i64) -> (u32, u32) {
    let packed = packed as u64;
    ((packed >> 32) as u32, packed as u32)
}

/// The `len` bytes at `ptr`, if they lie inside `data`.
pub(crate) fn guest_slice(data: &[u8], ptr: u32, len: u32) -> Option<&[u8]> {
    let start = ptr as usize;
    let end = start.checked_add(len as usize)?;
    data.get(start..end)
}

/// An instantiated engine module.
///
/// The store is not reentrant, so every call takes the lock for its whole
/// duration.
pub struct WasmEngine {
    inner: Mutex<Inner>,
    fuel: Option<u64>,
}

struct Inner {
    store: Store<HostState>,
    instance: Instance,
}

impl WasmEngine {
    pub(crate) fn new(store: Store<HostState>, instance: Instance, fuel: Option<u64>) -> Self {
        Self {
            inner: Mutex::new(Inner { store, instance }),
            fuel,
        }
    }
}

impl Inner {
    fn memory(&mut self) -> Result<Memory> {
        self.instance
            .get_memory(&mut self.store, MEMORY)
            .ok_or_else(|| HostError::ExportNotFound(MEMORY.to_string()))
    }

    fn typed<P: WasmParams, R: WasmResults>(&mut self, name: &str) -> Result<TypedFunc<P, R>> {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| HostError::ExportNotFound(name.to_string()))?;
        func.typed::<P, R>(&self.store)
            .map_err(|e| HostError::Signature {
                export: name.to_string(),
                message: e.to_string(),
            })
    }

    fn status<P: WasmParams, R: WasmResults>(&mut self, name: &str) -> CapabilityStatus {
        match self.typed::<P, R>(name) {
            Ok(_) => CapabilityStatus::Callable,
            Err(HostError::ExportNotFound(_)) => CapabilityStatus::Missing,
            Err(_) => CapabilityStatus::NotCallable,
        }
    }

    fn probe(&mut self, capability: Capability) -> CapabilityStatus {
        let name = capability.export_name();
        let status = match capability {
            Capability::ValidateConfig => self.status::<(i32, i32), i64>(name),
            Capability::GetVersion => self.status::<(), i64>(name),
        };
        if status != CapabilityStatus::Callable {
            return status;
        }

        // Both return strings through memory; only validate-config passes one in.
        if self.memory().is_err() {
            return CapabilityStatus::NotCallable;
        }
        if capability == Capability::ValidateConfig
            && self.status::<i32, i32>(ALLOC) != CapabilityStatus::Callable
        {
            return CapabilityStatus::NotCallable;
        }
        CapabilityStatus::Callable
    }

    fn write_input(&mut self, input: &str) -> Result<(u32, u32)> {
        let len =
            i32::try_from(input.len()).map_err(|_| HostError::InputTooLarge(input.len()))?;
        let alloc = self.typed::<i32, i32>(ALLOC)?;
        let ptr = alloc
            .call(&mut self.store, len)
            .map_err(|e| HostError::Trap(e.to_string()))?;

        let (ptr, len) = (ptr as u32, len as u32);
        let written = self.memory().and_then(|memory| {
            memory
                .write(&mut self.store, ptr as usize, input.as_bytes())
                .map_err(|_| HostError::OutOfBounds { ptr, len })
        });
        if let Err(e) = written {
            self.release_quietly(ptr, len, None);
            return Err(e);
        }
        Ok((ptr, len))
    }

    fn read_output(&mut self, packed: i64) -> Result<String> {
        let (ptr, len) = unpack(packed);
        if len == 0 {
            return Ok(String::new());
        }

        let memory = self.memory()?;
        let bytes = guest_slice(memory.data(&self.store), ptr, len)
            .ok_or(HostError::OutOfBounds { ptr, len })?
            .to_vec();
        self.release(ptr, len)?;
        Ok(String::from_utf8(bytes)?)
    }

    fn release(&mut self, ptr: u32, len: u32) -> Result<()> {
        let dealloc = match self.typed::<(i32, i32), ()>(DEALLOC) {
            Ok(dealloc) => dealloc,
            Err(HostError::ExportNotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        dealloc
            .call(&mut self.store, (ptr as i32, len as i32))
            .map_err(|e| HostError::Trap(e.to_string()))
    }

    /// Release a buffer on an error path, where the original error wins.
    fn release_quietly(&mut self, ptr: u32, len: u32, fuel: Option<u64>) {
        // A trap may have burned the fuel dealloc needs.
        let released = refuel(&mut self.store, fuel).and_then(|()| self.release(ptr, len));
        if let Err(e) = released {
            tracing::warn!(ptr, len, error = %e, "could not release guest buffer");
        }
    }

    fn validate(&mut self, config: &str, fuel: Option<u64>) -> Result<String> {
        refuel(&mut self.store, fuel)?;
        let (ptr, len) = self.write_input(config)?;

        let packed = self
            .typed::<(i32, i32), i64>(Capability::ValidateConfig.export_name())
            .and_then(|validate| {
                validate
                    .call(&mut self.store, (ptr as i32, len as i32))
                    .map_err(|e| HostError::Trap(e.to_string()))
            });
        let packed = match packed {
            Ok(packed) => packed,
            Err(e) => {
                self.release_quietly(ptr, len, fuel);
                return Err(e);
            }
        };

        self.release(ptr, len)?;
        self.read_output(packed)
    }

    fn version(&mut self, fuel: Option<u64>) -> Result<String> {
        refuel(&mut self.store, fuel)?;
        let get_version = self.typed::<(), i64>(Capability::GetVersion.export_name())?;
        let packed = get_version
            .call(&mut self.store, ())
            .map_err(|e| HostError::Trap(e.to_string()))?;
        self.read_output(packed)
    }
}

impl EngineInstance for WasmEngine {
    fn probe(&self, capability: Capability) -> CapabilityStatus {
        self.inner.lock().unwrap().probe(capability)
    }

    fn validate_config(&self, config: &str) -> std::result::Result<String, EngineError> {
        self.inner
            .lock()
            .unwrap()
            .validate(config, self.fuel)
            .map_err(|e| EngineError::call(Capability::ValidateConfig, e.to_string()))
    }

    fn get_version(&self) -> std::result::Result<String, EngineError> {
        self.inner
            .lock()
            .unwrap()
            .version(self.fuel)
            .map_err(|e| EngineError::call(Capability::GetVersion, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostConfig, WasmHost};
    use xray_editor_bootstrap::readiness;

    const ENGINE: &str = include_str!("../tests/fixtures/engine.wat");
    const NO_VALIDATOR: &str = include_str!("../tests/fixtures/no_validator.wat");
    const WRONG_SIGNATURE: &str = include_str!("../tests/fixtures/wrong_signature.wat");
    const START_SECTION: &str = include_str!("../tests/fixtures/start_section.wat");
    const COUNTING: &str = include_str!("../tests/fixtures/counting.wat");

    fn start(wat: &str, config: HostConfig) -> WasmEngine {
        let (hook, _signal) = readiness();
        WasmHost::new(config)
            .unwrap()
            .start(wat.as_bytes(), hook)
            .unwrap()
    }

    fn engine() -> WasmEngine {
        start(ENGINE, HostConfig::default())
    }

    #[test]
    fn unpack_splits_pointer_and_length() {
        assert_eq!(unpack(68719476741), (16, 5));
        assert_eq!(unpack(0), (0, 0));
        assert_eq!(unpack(-1), (u32::MAX, u32::MAX));
    }

    #[test]
    fn guest_slice_bounds() {
        let data = [1u8, 2, 3, 4];
        assert_eq!(guest_slice(&data, 1, 2), Some(&data[1..3]));
        assert_eq!(guest_slice(&data, 4, 0), Some(&data[4..4]));
        assert_eq!(guest_slice(&data, 3, 2), None);
        assert_eq!(guest_slice(&data, u32::MAX, u32::MAX), None);
    }

    #[test]
    fn probe_complete_engine() {
        let engine = engine();
        assert_eq!(
            engine.probe(Capability::ValidateConfig),
            CapabilityStatus::Callable
        );
        assert_eq!(
            engine.probe(Capability::GetVersion),
            CapabilityStatus::Callable
        );
    }

    #[test]
    fn probe_missing_validator() {
        let engine = start(NO_VALIDATOR, HostConfig::default());
        assert_eq!(
            engine.probe(Capability::ValidateConfig),
            CapabilityStatus::Missing
        );
        assert_eq!(
            engine.probe(Capability::GetVersion),
            CapabilityStatus::Callable
        );
    }

    #[test]
    fn probe_wrong_signature() {
        let engine = start(WRONG_SIGNATURE, HostConfig::default());
        assert_eq!(
            engine.probe(Capability::ValidateConfig),
            CapabilityStatus::NotCallable
        );
        assert_eq!(
            engine.probe(Capability::GetVersion),
            CapabilityStatus::Missing
        );
    }

    #[test]
    fn probe_requires_alloc_for_validation() {
        let wat = r#"
            (module
              (memory (export "memory") 1)
              (func (export "validate_config") (param i32 i32) (result i64)
                (i64.const 0)))
        "#;
        let engine = start(wat, HostConfig::default());
        assert_eq!(
            engine.probe(Capability::ValidateConfig),
            CapabilityStatus::NotCallable
        );
    }

    #[test]
    fn reads_version() {
        assert_eq!(engine().get_version().unwrap(), "1.8.0");
    }

    #[test]
    fn validates_config() {
        let engine = engine();
        assert_eq!(
            engine
                .validate_config(r#"{"outbounds":[{"protocol":"freedom"}]}"#)
                .unwrap(),
            ""
        );
        assert_eq!(
            engine.validate_config("{}").unwrap(),
            "missing field: outbounds"
        );
        assert_eq!(engine.validate_config("").unwrap(), "missing field: outbounds");
    }

    #[test]
    fn trap_becomes_engine_error() {
        let engine = engine();
        let err = engine.validate_config("!boom").unwrap_err();
        assert!(matches!(
            err,
            EngineError::Call {
                capability: Capability::ValidateConfig,
                ..
            }
        ));

        // The instance stays usable.
        assert_eq!(engine.validate_config("{\"log\":{}}").unwrap(), "");
    }

    fn released(engine: &WasmEngine) -> i32 {
        let mut inner = engine.inner.lock().unwrap();
        let released = inner.typed::<(), i32>("released").unwrap();
        released.call(&mut inner.store, ()).unwrap()
    }

    #[test]
    fn input_released_when_validation_traps() {
        let engine = start(COUNTING, HostConfig::default());
        assert!(engine.validate_config("{}").is_err());
        assert_eq!(released(&engine), 1);

        assert!(engine.validate_config("{\"log\":{}}").is_err());
        assert_eq!(released(&engine), 2);
    }

    #[test]
    fn input_released_when_write_fails() {
        let engine = start(COUNTING, HostConfig::default());
        let err = engine.validate_config("12345").unwrap_err();
        assert!(err.to_string().contains("out of bounds"));
        assert_eq!(released(&engine), 1);
    }

    #[test]
    fn fuel_bounds_each_call() {
        let engine = start(ENGINE, HostConfig::default().with_fuel(1_000_000));
        assert!(engine.validate_config("~spin").is_err());
        // Refuelled for the next call.
        assert_eq!(engine.validate_config("{\"log\":{}}").unwrap(), "");
        assert_eq!(engine.get_version().unwrap(), "1.8.0");
    }

    #[test]
    fn out_of_bounds_result() {
        // 0xFFFF0000 << 32 | 16
        let wat = r#"
            (module
              (memory (export "memory") 1)
              (func (export "get_version") (result i64)
                (i64.const -281474976710640)))
        "#;
        let engine = start(wat, HostConfig::default());
        let err = engine.get_version().unwrap_err();
        assert!(err.to_string().contains("out of bounds"));
    }

    #[test]
    fn invalid_utf8_result() {
        let wat = r#"
            (module
              (memory (export "memory") 1)
              (data (i32.const 8) "\ff\fe")
              (func (export "get_version") (result i64)
                (i64.const 34359738370)))
        "#;
        let engine = start(wat, HostConfig::default());
        let err = engine.get_version().unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn engine_without_version() {
        let engine = start(START_SECTION, HostConfig::default());
        assert_eq!(
            engine.probe(Capability::GetVersion),
            CapabilityStatus::Missing
        );
        assert_eq!(engine.validate_config("{}").unwrap(), "");
    }
}
