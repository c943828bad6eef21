//! localStorage 适配器，仅在浏览器中调用。

use web_sys::Storage;

use crate::game::GameState;
use crate::persist::{self, STORAGE_KEY};

fn local_storage() -> Option<Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

pub fn load() -> Option<String> {
    local_storage()?.get_item(STORAGE_KEY).ok().flatten()
}

pub fn save(state: &GameState) {
    let json = match persist::encode(state) {
        Ok(json) => json,
        Err(error) => {
            log::warn!("state not saved: {error}");
            return;
        }
    };
    if let Some(storage) = local_storage() {
        if let Err(error) = storage.set_item(STORAGE_KEY, &json) {
            log::warn!("localStorage write failed: {error:?}");
        }
    }
}

pub fn clear() {
    if let Some(storage) = local_storage() {
        if let Err(error) = storage.remove_item(STORAGE_KEY) {
            log::warn!("localStorage clear failed: {error:?}");
        }
    }
}
