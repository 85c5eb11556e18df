//! Native Windows backends: HKEY_LOCAL_MACHINE registry reads and
//! `GetFileAttributesW`.

#![cfg(target_os = "windows")]

use std::path::Path;

use cfprobe_core::{ProbeError, ProbeResult};
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{ERROR_NO_MORE_ITEMS, ERROR_SUCCESS, WIN32_ERROR};
use windows::Win32::Storage::FileSystem::{GetFileAttributesW, INVALID_FILE_ATTRIBUTES};
use windows::Win32::System::Registry::{
    RegCloseKey, RegEnumKeyExW, RegEnumValueW, RegGetValueW, RegOpenKeyExW, HKEY,
    HKEY_LOCAL_MACHINE, KEY_READ, RRF_RT_REG_SZ,
};

use crate::placeholder::AttributeSource;
use crate::registry::{collect_names, NameStep, RegistryKey, RegistrySource};

/// Longest key name the registry allows, plus the terminator.
const MAX_KEY_NAME: usize = 256;
/// Longest value name the registry allows, plus the terminator.
const MAX_VALUE_NAME: usize = 16_384;

/// Convert a Rust string to a null-terminated wide string.
fn to_wide(s: &str) -> Vec<u16> {
    let mut wide: Vec<u16> = s.encode_utf16().collect();
    wide.push(0);
    wide
}

fn check(status: WIN32_ERROR, step: &'static str, key: &str) -> ProbeResult<()> {
    if status == ERROR_SUCCESS {
        Ok(())
    } else {
        Err(ProbeError::registry(step, key, status.0))
    }
}

/// Registry keys below HKEY_LOCAL_MACHINE, opened read-only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeRegistry;

impl RegistrySource for NativeRegistry {
    fn open(&self, path: &str) -> ProbeResult<Box<dyn RegistryKey + '_>> {
        let wide = to_wide(path);
        let mut hkey = HKEY::default();
        let status = unsafe {
            RegOpenKeyExW(
                HKEY_LOCAL_MACHINE,
                PCWSTR::from_raw(wide.as_ptr()),
                None,
                KEY_READ,
                &mut hkey,
            )
        };
        check(status, "open", path)?;
        Ok(Box::new(NativeKey {
            hkey,
            path: path.to_string(),
        }))
    }
}

struct NativeKey {
    hkey: HKEY,
    path: String,
}

impl NativeKey {
    fn enumerate(
        &self,
        step: &'static str,
        capacity: usize,
        mut next: impl FnMut(u32, &mut [u16], &mut u32) -> WIN32_ERROR,
    ) -> ProbeResult<Vec<String>> {
        collect_names(step, &self.path, capacity, |index, buf| {
            let mut len = buf.len() as u32;
            let status = next(index, buf, &mut len);
            if status == ERROR_NO_MORE_ITEMS {
                NameStep::End
            } else if status == ERROR_SUCCESS {
                NameStep::Name(len as usize)
            } else {
                NameStep::Failed(status.0)
            }
        })
    }
}

impl RegistryKey for NativeKey {
    fn subkey_names(&self) -> ProbeResult<Vec<String>> {
        self.enumerate("enumerate subkeys", MAX_KEY_NAME, |index, buf, len| unsafe {
            RegEnumKeyExW(
                self.hkey,
                index,
                Some(PWSTR(buf.as_mut_ptr())),
                len,
                None,
                None,
                None,
                None,
            )
        })
    }

    fn value_names(&self) -> ProbeResult<Vec<String>> {
        self.enumerate("enumerate values", MAX_VALUE_NAME, |index, buf, len| unsafe {
            RegEnumValueW(
                self.hkey,
                index,
                Some(PWSTR(buf.as_mut_ptr())),
                len,
                None,
                None,
                None,
                None,
            )
        })
    }

    fn string_value(&self, name: &str) -> ProbeResult<String> {
        let wide_name = to_wide(name);
        let value = PCWSTR::from_raw(wide_name.as_ptr());

        // First call sizes the buffer, second call fills it.
        let mut size = 0u32;
        let status = unsafe {
            RegGetValueW(
                self.hkey,
                PCWSTR::null(),
                value,
                RRF_RT_REG_SZ,
                None,
                None,
                Some(&mut size as *mut u32),
            )
        };
        check(status, "size value", &self.path)?;

        let mut buf = vec![0u16; (size as usize).div_ceil(2)];
        let status = unsafe {
            RegGetValueW(
                self.hkey,
                PCWSTR::null(),
                value,
                RRF_RT_REG_SZ,
                None,
                Some(buf.as_mut_ptr().cast()),
                Some(&mut size as *mut u32),
            )
        };
        check(status, "read value", &self.path)?;

        let chars = (size as usize / 2).min(buf.len());
        let text = &buf[..chars];
        let end = text.iter().position(|&c| c == 0).unwrap_or(text.len());
        Ok(String::from_utf16_lossy(&text[..end]))
    }
}

impl Drop for NativeKey {
    fn drop(&mut self) {
        unsafe {
            let _ = RegCloseKey(self.hkey);
        }
    }
}

/// `GetFileAttributesW` on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeAttributes;

impl AttributeSource for NativeAttributes {
    fn attributes(&self, path: &Path) -> ProbeResult<u32> {
        let wide = to_wide(&path.to_string_lossy());
        let bits = unsafe { GetFileAttributesW(PCWSTR::from_raw(wide.as_ptr())) };
        if bits == INVALID_FILE_ATTRIBUTES {
            let code = std::io::Error::last_os_error()
                .raw_os_error()
                .unwrap_or_default() as u32;
            return Err(ProbeError::Attributes {
                path: path.to_path_buf(),
                code,
            });
        }
        Ok(bits)
    }
}
