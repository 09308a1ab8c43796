use std::borrow::Cow;
use std::ffi::{CStr, c_char};
use std::sync::{Mutex, TryLockError};
use std::time::Duration;

use anyhow::Result;
use log::*;
use shared::{Config, Core};

mod host;

pub use host::{EntityHandle, HostApi, InteractionDesc, PlayerInfo};
use host::HostWorld;

/// The running mod, or `None` before [inkling_pets_init] succeeds.
///
/// Only the host's main thread ever touches this, but the host may call back
/// into us while a check is running, so every entry point uses `try_lock` and
/// skips its work rather than deadlocking.
static CORE: Mutex<Option<Core<HostWorld>>> = Mutex::new(None);

/// Runs `f` with the mod's core if it's initialized and not already in use.
fn with_core<T>(f: impl FnOnce(&mut Core<HostWorld>) -> T) -> Option<T> {
    let mut guard = match CORE.try_lock() {
        Ok(guard) => guard,
        Err(TryLockError::WouldBlock) => {
            trace!("Core is busy, skipping");
            return None;
        }
        // A panic mid-check leaves nothing half-written that matters, since
        // all the real state lives in the host.
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
    };
    guard.as_mut().map(f)
}

/// Converts the host's clock, in seconds, to a [Duration].
fn host_time(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or_default()
}

/// Loads the config and creates the core.
///
/// ## Safety
///
/// See [HostWorld::new].
unsafe fn start(api: HostApi) -> Result<Core<HostWorld>> {
    let config = Config::load()?;
    log::set_max_level(config.log_level());
    api.log_capabilities();

    // Safety: Guaranteed by the caller.
    let world = unsafe { HostWorld::new(api) };
    Core::new(world, &config)
}

/// The entrypoint called by the host's mod loader once the game's managed
/// assemblies are loaded.
///
/// Returns whether the mod started successfully. If it didn't, every other
/// entry point does nothing.
///
/// ## Safety
///
/// `api` must point to a valid [HostApi] whose functions remain callable from
/// the host's main thread for the rest of the process, and this must be called
/// on that thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn inkling_pets_init(api: *const HostApi) -> bool {
    shared::handle_panics();
    shared::start_logger();

    // Safety: Guaranteed by the caller.
    let Some(api) = (unsafe { api.as_ref() }).copied() else {
        error!("Host passed a null API table");
        return false;
    };

    // Safety: Guaranteed by the caller.
    match unsafe { start(api) } {
        Ok(core) => {
            let mut guard = CORE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = Some(core);
            info!("Inkling Pets {} initialized.", env!("CARGO_PKG_VERSION"));
            true
        }
        Err(err) => {
            error!("Couldn't start Inkling Pets: {err:?}");
            shared::message_box(format!("Inkling Pets couldn't start:\n\n{err}"));
            false
        }
    }
}

/// Called by the host every frame with its current time in seconds. Runs a pet
/// check whenever the check interval has elapsed.
#[unsafe(no_mangle)]
pub extern "C" fn inkling_pets_update(time: f64) {
    with_core(|core| core.update(host_time(time)));
}

/// Called by the host whenever a scene finishes loading. Forces a pet check on
/// the next frame.
///
/// ## Safety
///
/// `name` must be null or point to a NUL-terminated string that's valid for
/// the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn inkling_pets_scene_loaded(build_index: i32, name: *const c_char) {
    let name = if name.is_null() {
        Cow::Borrowed("<unnamed>")
    } else {
        // Safety: Guaranteed by the caller.
        unsafe { CStr::from_ptr(name) }.to_string_lossy()
    };
    info!("Scene loaded: {name} (Build Index: {build_index})");

    with_core(|core| {
        core.reset_interval();
        core.world().prune_destroyed();
    });
}

/// Called by the host when the player `actor` selects one of our
/// interactions on `entity` from `distance` away at host time `time`.
///
/// Returns whether the interaction fired. The host should treat `false` as the
/// interaction being unavailable right now.
#[unsafe(no_mangle)]
pub extern "C" fn inkling_pets_interact(
    entity: EntityHandle,
    actor: i32,
    distance: f32,
    time: f64,
) -> bool {
    with_core(|core| match core.world().select(entity, actor, distance, host_time(time)) {
        Some(Ok(())) => true,
        Some(Err(refusal)) => {
            debug!("Interaction on {:?} refused: {}", entity, refusal);
            false
        }
        None => {
            debug!("No interaction is tracked for {:?}", entity);
            false
        }
    })
    .unwrap_or(false)
}

/// Called by the host before it unloads the mod.
#[unsafe(no_mangle)]
pub extern "C" fn inkling_pets_shutdown() {
    let mut guard = CORE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if guard.take().is_some() {
        info!("Inkling Pets shut down.");
    }
    log::logger().flush();
}
