//! CSI parameter parsing
//!
//! Parameters are semicolon separated decimal numbers. A colon introduces
//! sub-parameters that belong to the preceding value (`38:2:255:0:0`).

/// Maximum number of parameters we'll track
const MAX_PARAMS: usize = 32;

/// CSI parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    /// Parameter values (0 means default/unspecified)
    values: Vec<u16>,
    /// Sub-parameters, one list per value (usually empty)
    subparams: Vec<Vec<u16>>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse parameters from the raw bytes collected between CSI and the final byte
    pub fn parse(bytes: &[u8]) -> Self {
        let mut params = Self::new();
        if bytes.is_empty() {
            return params;
        }

        let mut current: u16 = 0;
        let mut in_subparam = false;
        let mut subparams: Vec<u16> = Vec::new();

        for &byte in bytes {
            match byte {
                b'0'..=b'9' => {
                    current = current
                        .saturating_mul(10)
                        .saturating_add((byte - b'0') as u16);
                }
                b':' => {
                    if in_subparam {
                        subparams.push(current);
                    } else {
                        params.push(current, Vec::new());
                        in_subparam = true;
                    }
                    current = 0;
                }
                b';' => {
                    if in_subparam {
                        subparams.push(current);
                        params.attach_subparams(std::mem::take(&mut subparams));
                        in_subparam = false;
                    } else {
                        params.push(current, Vec::new());
                    }
                    current = 0;
                }
                _ => {}
            }
        }

        if in_subparam {
            subparams.push(current);
            params.attach_subparams(subparams);
        } else {
            params.push(current, Vec::new());
        }

        params
    }

    fn push(&mut self, value: u16, subparams: Vec<u16>) {
        if self.values.len() < MAX_PARAMS {
            self.values.push(value);
            self.subparams.push(subparams);
        }
    }

    fn attach_subparams(&mut self, subparams: Vec<u16>) {
        if let Some(last) = self.subparams.last_mut() {
            if last.is_empty() {
                *last = subparams;
            }
        }
    }

    /// Get parameter at index, returning None if absent or zero
    pub fn get(&self, index: usize) -> Option<u16> {
        self.values.get(index).copied().filter(|&v| v != 0)
    }

    /// Get parameter at index with default value
    pub fn get_or(&self, index: usize, default: u16) -> u16 {
        self.get(index).unwrap_or(default)
    }

    /// Get raw value at index (0 if not present)
    pub fn raw(&self, index: usize) -> u16 {
        self.values.get(index).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sub-parameters attached to the value at `index`
    pub fn subparams(&self, index: usize) -> &[u16] {
        self.subparams.get(index).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.values.iter().copied()
    }
}
