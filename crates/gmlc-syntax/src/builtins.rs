//! Builtin symbol lookup.
//!
//! The compiler never owns knowledge about the runtime's builtins. It asks a
//! [`SymbolTable`] whether a name is a constant, a builtin variable, a
//! function or script, and which runtime functions implement each accessor.
//! [`BuiltinTable`] is the stock implementation: a set of hash maps that can
//! be loaded from JSON and extended on top of [`BuiltinTable::standard`].
//!
//! Tables are only read during a compile, so one table can be shared by any
//! number of compiles running on different threads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::Accessor;
use crate::error::{Error, Result};

/// Read-only name lookup used by every compiler stage.
pub trait SymbolTable: Send + Sync {
    /// Value of a named constant, such as `pi` or an asset index.
    fn constant(&self, name: &str) -> Option<f64>;
    fn variable(&self, name: &str) -> Option<VariableInfo>;
    /// Builtin functions and scripts.
    fn function(&self, name: &str) -> Option<FunctionInfo>;
    /// Runtime functions implementing `accessor` with `dims` indices.
    fn accessor(&self, accessor: Accessor, dims: usize) -> Option<AccessorInfo>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// Lives in the global instance; read through `pushvar`.
    Global,
    Instance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableInfo {
    pub kind: VariableKind,
    #[serde(default)]
    pub array: bool,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionInfo {
    /// Expected argument count; `None` accepts any number.
    #[serde(default)]
    pub arguments: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorInfo {
    pub accessor: Accessor,
    pub dims: usize,
    pub read: String,
    pub write: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuiltinTable {
    pub constants: HashMap<String, f64>,
    pub variables: HashMap<String, VariableInfo>,
    pub functions: HashMap<String, FunctionInfo>,
    pub accessors: Vec<AccessorInfo>,
}

impl BuiltinTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| Error::Json { what: "builtin table", source })
    }

    /// Adds every entry of `other`, replacing entries with the same name.
    pub fn extend(&mut self, other: BuiltinTable) {
        self.constants.extend(other.constants);
        self.variables.extend(other.variables);
        self.functions.extend(other.functions);
        for info in other.accessors {
            self.accessors.retain(|a| !(a.accessor == info.accessor && a.dims == info.dims));
            self.accessors.push(info);
        }
    }

    pub fn with_constant(mut self, name: &str, value: f64) -> Self {
        self.constants.insert(name.to_string(), value);
        self
    }

    pub fn with_variable(mut self, name: &str, kind: VariableKind, array: bool, read_only: bool) -> Self {
        self.variables.insert(name.to_string(), VariableInfo { kind, array, read_only });
        self
    }

    pub fn with_function(mut self, name: &str, arguments: Option<usize>) -> Self {
        self.functions.insert(name.to_string(), FunctionInfo { arguments });
        self
    }

    pub fn with_accessor(mut self, accessor: Accessor, dims: usize, read: &str, write: &str) -> Self {
        self.accessors.push(AccessorInfo {
            accessor,
            dims,
            read: read.to_string(),
            write: write.to_string(),
        });
        self
    }

    /// A representative set of GameMaker builtins.
    pub fn standard() -> Self {
        use VariableKind::{Global, Instance};

        let mut table = BuiltinTable::new()
            .with_constant("true", 1.0)
            .with_constant("false", 0.0)
            .with_constant("pi", std::f64::consts::PI)
            .with_constant("self", -1.0)
            .with_constant("other", -2.0)
            .with_constant("all", -3.0)
            .with_constant("noone", -4.0)
            .with_constant("global", -5.0)
            .with_constant("local", -7.0)
            .with_constant("c_black", 0.0)
            .with_constant("c_white", 16777215.0)
            .with_constant("c_red", 255.0)
            .with_constant("fa_left", 0.0)
            .with_constant("fa_center", 1.0)
            .with_constant("fa_right", 2.0)
            .with_constant("vk_enter", 13.0)
            .with_constant("vk_space", 32.0)
            .with_constant("vk_left", 37.0)
            .with_constant("vk_up", 38.0)
            .with_constant("vk_right", 39.0)
            .with_constant("vk_down", 40.0);

        for name in [
            "x", "y", "xstart", "ystart", "xprevious", "yprevious", "hspeed", "vspeed", "speed",
            "direction", "gravity", "gravity_direction", "friction", "image_index", "image_speed",
            "image_xscale", "image_yscale", "image_angle", "image_alpha", "image_blend",
            "sprite_index", "mask_index", "depth", "visible", "solid", "persistent",
        ] {
            table = table.with_variable(name, Instance, false, false);
        }
        for name in ["id", "object_index", "sprite_width", "sprite_height", "bbox_left", "bbox_right", "bbox_top", "bbox_bottom", "argument_count"] {
            table = table.with_variable(name, Instance, false, true);
        }
        for n in 0..16 {
            table = table.with_variable(&format!("argument{}", n), Instance, false, false);
        }
        table = table
            .with_variable("argument", Instance, true, false)
            .with_variable("alarm", Instance, true, false);

        for name in ["room", "score", "health", "lives", "room_speed", "keyboard_key", "keyboard_string", "background_color"] {
            table = table.with_variable(name, Global, false, false);
        }
        for name in ["fps", "current_time", "mouse_x", "mouse_y", "room_width", "room_height"] {
            table = table.with_variable(name, Global, false, true);
        }
        for name in ["view_xview", "view_yview", "view_wview", "view_hview", "view_visible"] {
            table = table.with_variable(name, Global, true, false);
        }

        let functions: &[(&str, Option<usize>)] = &[
            ("show_message", Some(1)),
            ("show_debug_message", Some(1)),
            ("instance_create", Some(3)),
            ("instance_destroy", None),
            ("instance_exists", Some(1)),
            ("instance_number", Some(1)),
            ("string", Some(1)),
            ("real", Some(1)),
            ("int64", Some(1)),
            ("chr", Some(1)),
            ("ord", Some(1)),
            ("string_length", Some(1)),
            ("string_upper", Some(1)),
            ("string_copy", Some(3)),
            ("floor", Some(1)),
            ("round", Some(1)),
            ("abs", Some(1)),
            ("sqrt", Some(1)),
            ("random", Some(1)),
            ("irandom", Some(1)),
            ("choose", None),
            ("min", None),
            ("max", None),
            ("point_distance", Some(4)),
            ("place_meeting", Some(3)),
            ("keyboard_check", Some(1)),
            ("draw_text", Some(3)),
            ("draw_sprite", Some(4)),
            ("array_length_1d", Some(1)),
            ("ds_map_create", Some(0)),
            ("ds_map_find_value", Some(2)),
            ("ds_map_set", Some(3)),
            ("ds_map_add", Some(3)),
            ("ds_list_create", Some(0)),
            ("ds_list_find_value", Some(2)),
            ("ds_list_set", Some(3)),
            ("ds_list_add", None),
            ("ds_grid_create", Some(2)),
            ("ds_grid_get", Some(3)),
            ("ds_grid_set", Some(4)),
        ];
        for (name, arguments) in functions {
            table = table.with_function(name, *arguments);
        }

        table
            .with_accessor(Accessor::Map, 1, "ds_map_find_value", "ds_map_set")
            .with_accessor(Accessor::List, 1, "ds_list_find_value", "ds_list_set")
            .with_accessor(Accessor::Grid, 2, "ds_grid_get", "ds_grid_set")
    }
}

impl SymbolTable for BuiltinTable {
    fn constant(&self, name: &str) -> Option<f64> {
        self.constants.get(name).copied()
    }

    fn variable(&self, name: &str) -> Option<VariableInfo> {
        self.variables.get(name).copied()
    }

    fn function(&self, name: &str) -> Option<FunctionInfo> {
        self.functions.get(name).copied()
    }

    fn accessor(&self, accessor: Accessor, dims: usize) -> Option<AccessorInfo> {
        self.accessors
            .iter()
            .find(|a| a.accessor == accessor && a.dims == dims)
            .cloned()
    }
}
