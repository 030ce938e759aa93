//! Type descriptors for type-erased block storage.
//!
//! A block's bytes are stored untyped. The descriptor captured at creation
//! is compared against the call-site type on every typed write or read.

use std::any::TypeId;
use std::fmt;
use std::mem::{align_of, size_of};

use bytemuck::Pod;

/// Describes the Rust type a block was created from.
#[derive(Clone, Copy, Debug)]
pub struct TypeDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    /// Size of one element in bytes.
    element_size: usize,
    align: usize,
    /// 1 for single values.
    count: usize,
}

impl TypeDescriptor {
    /// Descriptor for a single value of `T`.
    pub fn of<T: Pod>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            element_size: size_of::<T>(),
            align: align_of::<T>(),
            count: 1,
        }
    }

    /// Descriptor for `count` elements of `T` laid out `element_size` bytes apart.
    pub fn array_of<T: Pod>(element_size: usize, count: usize) -> Self {
        Self {
            element_size,
            count,
            ..Self::of::<T>()
        }
    }

    /// Whether `T` is the type this descriptor was captured from.
    pub fn is<T: Pod>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Whether two descriptors name the same element type.
    pub fn same_type(&self, other: &TypeDescriptor) -> bool {
        self.type_id == other.type_id
    }

    /// Name of the element type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Alignment of the element type.
    pub fn align(&self) -> usize {
        self.align
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether this describes an array block.
    pub fn is_array(&self) -> bool {
        self.count != 1
    }

    /// Total byte size of the described data.
    pub fn byte_size(&self) -> usize {
        self.element_size * self.count
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
            && self.element_size == other.element_size
            && self.count == other.count
    }
}

impl Eq for TypeDescriptor {}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array() {
            write!(f, "[{}; {}]", self.type_name, self.count)
        } else {
            write!(f, "{}", self.type_name)
        }
    }
}
