//! Numeric and string variable storage (spec.md §3): a fixed slot range
//! with optional clamp limits, a sparse overflow list, array variables and
//! two alias maps.

use anyhow::{bail, Result as AResult};
use std::collections::HashMap;

const DEFAULT_SLOT_COUNT: usize = 4096;
pub const MAX_ARRAY_DIMENSIONS: usize = 20;

#[derive(Clone, Copy, Debug)]
struct Clamp {
    lower: i32,
    upper: i32,
}

impl Clamp {
    fn apply(self, value: i32) -> i32 {
        value.clamp(self.lower, self.upper)
    }
}

/// A singly-linked-list node in spirit; stored as a flat map keyed by
/// declaration number to avoid an actual pointer chain, but addressed the
/// same way the script does (`?N[e1][e2]...`).
#[derive(Clone, Debug)]
pub struct ArrayVariable {
    pub no: i32,
    pub dims: Vec<u32>,
    data: Vec<i32>,
}

impl ArrayVariable {
    fn new(no: i32, dims: Vec<u32>) -> AResult<Self> {
        if dims.is_empty() || dims.len() > MAX_ARRAY_DIMENSIONS {
            bail!("Array ?{} must have between 1 and {} dimensions", no, MAX_ARRAY_DIMENSIONS);
        }
        let size = dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d as usize)).ok_or_else(|| anyhow::anyhow!("Array ?{} is too large", no))?;
        Ok(Self { no, dims, data: vec![0; size] })
    }

    fn flat_index(&self, indices: &[u32]) -> AResult<usize> {
        if indices.len() != self.dims.len() {
            bail!("Array ?{} expects {} subscripts, got {}", self.no, self.dims.len(), indices.len());
        }
        let mut flat = 0usize;
        for (index, &bound) in indices.iter().zip(&self.dims) {
            if *index >= bound {
                bail!("Array ?{} subscript {} out of range [0,{})", self.no, index, bound);
            }
            flat = flat * bound as usize + *index as usize;
        }
        Ok(flat)
    }

    pub fn get(&self, indices: &[u32]) -> AResult<i32> {
        Ok(self.data[self.flat_index(indices)?])
    }

    pub fn set(&mut self, indices: &[u32], value: i32) -> AResult<()> {
        let flat = self.flat_index(indices)?;
        self.data[flat] = value;
        Ok(())
    }

    /// The array's backing storage in flat (row-major) order, as written to
    /// and read from a save file.
    #[must_use]
    pub fn flat_values(&self) -> &[i32] {
        &self.data
    }

    pub fn load_flat_values(&mut self, values: &[i32]) {
        let n = values.len().min(self.data.len());
        self.data[..n].copy_from_slice(&values[..n]);
    }
}

#[derive(Clone, Debug, Default)]
struct Slot {
    int: i32,
    string: String,
    clamp: Option<Clamp>,
}

/// Fixed-range `{int, string}` pairs plus a sparse overflow past the
/// configured range, integer arrays keyed by declaration number, and the
/// two alias maps (`name -> int slot`, `name -> string slot`).
#[derive(Debug)]
pub struct VariableStore {
    slots: Vec<Slot>,
    overflow: HashMap<u32, Slot>,
    arrays: HashMap<i32, ArrayVariable>,
    /// Declaration order of `arrays`' keys, oldest first. A `dim` that
    /// re-declares an existing array number does not move its position.
    array_order: Vec<i32>,
    int_aliases: HashMap<String, u32>,
    str_aliases: HashMap<String, u32>,
    num_aliases: HashMap<String, i32>,
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::with_slot_count(DEFAULT_SLOT_COUNT)
    }
}

impl VariableStore {
    #[must_use]
    pub fn with_slot_count(count: usize) -> Self {
        Self {
            slots: vec![Slot::default(); count],
            overflow: HashMap::new(),
            arrays: HashMap::new(),
            array_order: Vec::new(),
            int_aliases: HashMap::new(),
            str_aliases: HashMap::new(),
            num_aliases: HashMap::new(),
        }
    }

    fn slot(&self, no: u32) -> Slot {
        match self.slots.get(no as usize) {
            Some(slot) => slot.clone(),
            None => self.overflow.get(&no).cloned().unwrap_or_default(),
        }
    }

    fn slot_mut(&mut self, no: u32) -> &mut Slot {
        if (no as usize) < self.slots.len() {
            &mut self.slots[no as usize]
        } else {
            self.overflow.entry(no).or_default()
        }
    }

    #[must_use]
    pub fn int(&self, no: u32) -> i32 {
        self.slot(no).int
    }

    pub fn set_int(&mut self, no: u32, value: i32) {
        let slot = self.slot_mut(no);
        slot.int = slot.clamp.map_or(value, |clamp| clamp.apply(value));
    }

    #[must_use]
    pub fn string(&self, no: u32) -> String {
        self.slot(no).string
    }

    pub fn set_string(&mut self, no: u32, value: impl Into<String>) {
        self.slot_mut(no).string = value.into();
    }

    pub fn set_clamp(&mut self, no: u32, lower: i32, upper: i32) {
        let clamp = Clamp { lower, upper };
        let slot = self.slot_mut(no);
        slot.clamp = Some(clamp);
        slot.int = clamp.apply(slot.int);
    }

    pub fn declare_array(&mut self, no: i32, dims: Vec<u32>) -> AResult<()> {
        let array = ArrayVariable::new(no, dims)?;
        if self.arrays.insert(no, array).is_none() {
            self.array_order.push(no);
        }
        Ok(())
    }

    pub fn array(&self, no: i32) -> AResult<&ArrayVariable> {
        self.arrays.get(&no).ok_or_else(|| anyhow::anyhow!("Array ?{} is undeclared", no))
    }

    pub fn array_mut(&mut self, no: i32) -> AResult<&mut ArrayVariable> {
        self.arrays.get_mut(&no).ok_or_else(|| anyhow::anyhow!("Array ?{} is undeclared", no))
    }

    /// `numalias name, value`: binds `name` to a constant integer, usable
    /// anywhere an integer literal is (e.g. inside `dim`).
    pub fn define_num_alias(&mut self, name: impl Into<String>, value: i32) {
        self.num_aliases.insert(name.into(), value);
    }

    #[must_use]
    pub fn num_alias(&self, name: &str) -> Option<i32> {
        self.num_aliases.get(name).copied()
    }

    pub fn define_int_alias(&mut self, name: impl Into<String>, slot: u32) {
        self.int_aliases.insert(name.into(), slot);
    }

    #[must_use]
    pub fn int_alias(&self, name: &str) -> Option<u32> {
        self.int_aliases.get(name).copied()
    }

    pub fn define_str_alias(&mut self, name: impl Into<String>, slot: u32) {
        self.str_aliases.insert(name.into(), slot);
    }

    #[must_use]
    pub fn str_alias(&self, name: &str) -> Option<u32> {
        self.str_aliases.get(name).copied()
    }

    pub fn arrays_in_declaration_order(&self) -> Vec<&ArrayVariable> {
        self.array_order.iter().filter_map(|no| self.arrays.get(no)).collect()
    }

    /// Re-declares and fills an array from a save file's snapshot.
    pub fn restore_array(&mut self, no: i32, dims: Vec<u32>, data: &[i32]) -> AResult<()> {
        self.declare_array(no, dims)?;
        self.array_mut(no)?.load_flat_values(data);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn swap_via_mov_round_trip_is_a_no_op() {
        let mut vars = VariableStore::default();
        vars.set_int(0, 1);
        vars.set_int(1, 2);
        let (a, b) = (vars.int(0), vars.int(1));
        vars.set_int(0, b);
        vars.set_int(1, a);
        vars.set_int(0, vars.int(1));
        assert_eq!(vars.int(0), 2);
        assert_eq!(vars.int(1), 1);
    }

    #[test]
    fn clamp_restricts_assigned_values() {
        let mut vars = VariableStore::default();
        vars.set_clamp(5, 0, 10);
        vars.set_int(5, 99);
        assert_eq!(vars.int(5), 10);
        vars.set_int(5, -5);
        assert_eq!(vars.int(5), 0);
    }

    #[test]
    fn array_bounds_are_enforced() {
        let mut vars = VariableStore::default();
        vars.declare_array(5, vec![3, 4]).unwrap();
        vars.array_mut(5).unwrap().set(&[2, 3], 42).unwrap();
        assert_eq!(vars.array(5).unwrap().get(&[2, 3]).unwrap(), 42);
        assert!(vars.array(5).unwrap().get(&[3, 0]).is_err());
        assert!(vars.array(5).unwrap().get(&[0, 4]).is_err());
    }

    #[test]
    fn slots_past_the_configured_range_still_work() {
        let mut vars = VariableStore::with_slot_count(4);
        vars.set_int(1000, 7);
        assert_eq!(vars.int(1000), 7);
    }

    #[test]
    fn arrays_in_declaration_order_ignores_array_number() {
        let mut vars = VariableStore::default();
        vars.declare_array(5, vec![3]).unwrap();
        vars.declare_array(2, vec![4]).unwrap();
        let order: Vec<i32> = vars.arrays_in_declaration_order().into_iter().map(|array| array.no).collect();
        assert_eq!(order, vec![5, 2]);
    }

    #[test]
    fn redeclaring_an_array_keeps_its_original_position() {
        let mut vars = VariableStore::default();
        vars.declare_array(5, vec![3]).unwrap();
        vars.declare_array(2, vec![4]).unwrap();
        vars.declare_array(5, vec![1]).unwrap();
        let order: Vec<i32> = vars.arrays_in_declaration_order().into_iter().map(|array| array.no).collect();
        assert_eq!(order, vec![5, 2]);
    }
}
