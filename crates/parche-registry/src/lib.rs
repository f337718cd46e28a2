//! Node type registry for the parche modular patch engine.
//!
//! This crate provides the immutable table of node types the rest of the
//! system is built on. Each entry describes one node type's shape: its input
//! ports with default values, its output ports, its parameters with defaults,
//! and whether the type is internal (emitted by the schedule compiler, never
//! user-creatable). The table is constructed once at startup and shared by
//! reference; nothing mutates it afterwards.
//!
//! # Example
//!
//! ```rust
//! use parche_registry::{NodeCategory, NodeRegistry};
//!
//! let registry = NodeRegistry::new();
//!
//! // List every user-creatable type
//! for ty in registry.all() {
//!     if !ty.internal {
//!         println!("{}: {}", ty.name, ty.description);
//!     }
//! }
//!
//! // Look up a type's shape
//! let delay = registry.get("delay").unwrap();
//! assert_eq!(delay.params[0].name, "time");
//!
//! // Filter by category
//! for ty in registry.in_category(NodeCategory::Source) {
//!     println!("source: {}", ty.name);
//! }
//! ```

/// Category of node type for organization and UI menu grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Signal generators (oscillators, noise, LFO)
    Source,
    /// Arithmetic on signals (add, multiply)
    Math,
    /// Spectral shaping (lowpass and friends)
    Filter,
    /// Gate-driven amplitude envelopes
    Envelope,
    /// Stepped pattern generators
    Sequencer,
    /// Time-domain processors (delay lines)
    Time,
    /// Boundary nodes (master output, editor probes)
    Io,
}

impl NodeCategory {
    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            NodeCategory::Source => "Source",
            NodeCategory::Math => "Math",
            NodeCategory::Filter => "Filter",
            NodeCategory::Envelope => "Envelope",
            NodeCategory::Sequencer => "Sequencer",
            NodeCategory::Time => "Time",
            NodeCategory::Io => "I/O",
        }
    }

    /// Returns a description of the category.
    pub const fn description(&self) -> &'static str {
        match self {
            NodeCategory::Source => "Oscillators, noise, and other signal generators",
            NodeCategory::Math => "Signal arithmetic: mixing, scaling, ring modulation",
            NodeCategory::Filter => "Lowpass and other spectral shaping",
            NodeCategory::Envelope => "Gate-driven amplitude envelopes",
            NodeCategory::Sequencer => "Stepped pattern and control generators",
            NodeCategory::Time => "Delay lines and other time-domain processors",
            NodeCategory::Io => "Master output and editor-facing probes",
        }
    }
}

/// An input port declared by a node type: a name and the constant value the
/// port reads when nothing is connected to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortSpec {
    /// Port name, unique within the type's input list.
    pub name: &'static str,
    /// Value an unconnected instance of this port produces.
    pub default: f32,
}

/// A parameter declared by a node type: a name and its default value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Parameter name, unique within the type's parameter list.
    pub name: &'static str,
    /// Initial value for freshly created nodes, and the reset target for
    /// `set_param` with a null value.
    pub default: f32,
}

/// Describes one node type: the complete port and parameter shape an
/// instance of this type has.
///
/// When a type declares an input port and a parameter with the same name,
/// an unconnected instance of that port reads the live parameter value
/// instead of the port's constant default. Oscillators use this for `freq`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeType {
    /// Unique identifier for the type (lowercase, no spaces).
    pub name: &'static str,
    /// Human-readable name.
    pub label: &'static str,
    /// Brief description of what the node does.
    pub description: &'static str,
    /// Category for organization.
    pub category: NodeCategory,
    /// Ordered input ports.
    pub inputs: &'static [PortSpec],
    /// Ordered output port names.
    pub outputs: &'static [&'static str],
    /// Ordered parameters.
    pub params: &'static [ParamSpec],
    /// Internal types are emitted by the schedule compiler and rejected by
    /// `create_node`.
    pub internal: bool,
}

impl NodeType {
    /// Position of an input port in the type's input list.
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|p| p.name == name)
    }

    /// Input port spec by name.
    pub fn input(&self, name: &str) -> Option<&PortSpec> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Position of an output port in the type's output list.
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|p| *p == name)
    }

    /// Position of a parameter in the type's parameter list.
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    /// Parameter spec by name.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Registry of all available node types.
///
/// Built once at startup with the builtin table registered; every other
/// component receives it as a shared reference and treats it as immutable.
#[derive(Debug)]
pub struct NodeRegistry {
    entries: Vec<NodeType>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    /// Create a new registry with all builtin node types registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(16),
        };
        registry.register_builtin_types();
        registry
    }

    /// Register all builtin node types.
    #[allow(clippy::too_many_lines)]
    fn register_builtin_types(&mut self) {
        // Oscillators
        self.register(NodeType {
            name: "sine",
            label: "Sine",
            description: "Sine wave oscillator",
            category: NodeCategory::Source,
            inputs: &[PortSpec {
                name: "freq",
                default: 440.0,
            }],
            outputs: &["out"],
            params: &[
                ParamSpec {
                    name: "freq",
                    default: 440.0,
                },
                ParamSpec {
                    name: "amp",
                    default: 1.0,
                },
            ],
            internal: false,
        });

        self.register(NodeType {
            name: "saw",
            label: "Saw",
            description: "Sawtooth oscillator",
            category: NodeCategory::Source,
            inputs: &[PortSpec {
                name: "freq",
                default: 440.0,
            }],
            outputs: &["out"],
            params: &[
                ParamSpec {
                    name: "freq",
                    default: 440.0,
                },
                ParamSpec {
                    name: "amp",
                    default: 1.0,
                },
            ],
            internal: false,
        });

        self.register(NodeType {
            name: "square",
            label: "Square",
            description: "Square oscillator with variable pulse width",
            category: NodeCategory::Source,
            inputs: &[PortSpec {
                name: "freq",
                default: 440.0,
            }],
            outputs: &["out"],
            params: &[
                ParamSpec {
                    name: "freq",
                    default: 440.0,
                },
                ParamSpec {
                    name: "amp",
                    default: 1.0,
                },
                ParamSpec {
                    name: "width",
                    default: 0.5,
                },
            ],
            internal: false,
        });

        self.register(NodeType {
            name: "triangle",
            label: "Triangle",
            description: "Triangle wave oscillator",
            category: NodeCategory::Source,
            inputs: &[PortSpec {
                name: "freq",
                default: 440.0,
            }],
            outputs: &["out"],
            params: &[
                ParamSpec {
                    name: "freq",
                    default: 440.0,
                },
                ParamSpec {
                    name: "amp",
                    default: 1.0,
                },
            ],
            internal: false,
        });

        self.register(NodeType {
            name: "noise",
            label: "Noise",
            description: "White noise generator",
            category: NodeCategory::Source,
            inputs: &[],
            outputs: &["out"],
            params: &[ParamSpec {
                name: "amp",
                default: 1.0,
            }],
            internal: false,
        });

        self.register(NodeType {
            name: "lfo",
            label: "LFO",
            description: "Low-frequency control oscillator",
            category: NodeCategory::Source,
            inputs: &[],
            outputs: &["out"],
            params: &[
                ParamSpec {
                    name: "freq",
                    default: 2.0,
                },
                ParamSpec {
                    name: "amp",
                    default: 1.0,
                },
            ],
            internal: false,
        });

        // Math
        self.register(NodeType {
            name: "add",
            label: "Add",
            description: "Sums two signals",
            category: NodeCategory::Math,
            inputs: &[
                PortSpec {
                    name: "in0",
                    default: 0.0,
                },
                PortSpec {
                    name: "in1",
                    default: 0.0,
                },
            ],
            outputs: &["out"],
            params: &[],
            internal: false,
        });

        self.register(NodeType {
            name: "mul",
            label: "Mul",
            description: "Multiplies two signals (ring mod / VCA)",
            category: NodeCategory::Math,
            inputs: &[
                PortSpec {
                    name: "in0",
                    default: 0.0,
                },
                PortSpec {
                    name: "in1",
                    default: 1.0,
                },
            ],
            outputs: &["out"],
            params: &[],
            internal: false,
        });

        // Filter
        self.register(NodeType {
            name: "lowpass",
            label: "Lowpass",
            description: "Resonant lowpass filter",
            category: NodeCategory::Filter,
            inputs: &[PortSpec {
                name: "in",
                default: 0.0,
            }],
            outputs: &["out"],
            params: &[
                ParamSpec {
                    name: "cutoff",
                    default: 1000.0,
                },
                ParamSpec {
                    name: "resonance",
                    default: 0.5,
                },
            ],
            internal: false,
        });

        // Envelope
        self.register(NodeType {
            name: "adsr",
            label: "ADSR",
            description: "Gate-driven ADSR envelope",
            category: NodeCategory::Envelope,
            inputs: &[PortSpec {
                name: "gate",
                default: 0.0,
            }],
            outputs: &["out"],
            params: &[
                ParamSpec {
                    name: "attack",
                    default: 0.01,
                },
                ParamSpec {
                    name: "decay",
                    default: 0.1,
                },
                ParamSpec {
                    name: "sustain",
                    default: 0.7,
                },
                ParamSpec {
                    name: "release",
                    default: 0.3,
                },
            ],
            internal: false,
        });

        // Sequencer
        self.register(NodeType {
            name: "seq8",
            label: "Seq 8",
            description: "Eight-step value sequencer",
            category: NodeCategory::Sequencer,
            inputs: &[],
            outputs: &["out"],
            params: &[
                ParamSpec {
                    name: "rate",
                    default: 2.0,
                },
                ParamSpec {
                    name: "step0",
                    default: 0.0,
                },
                ParamSpec {
                    name: "step1",
                    default: 0.0,
                },
                ParamSpec {
                    name: "step2",
                    default: 0.0,
                },
                ParamSpec {
                    name: "step3",
                    default: 0.0,
                },
                ParamSpec {
                    name: "step4",
                    default: 0.0,
                },
                ParamSpec {
                    name: "step5",
                    default: 0.0,
                },
                ParamSpec {
                    name: "step6",
                    default: 0.0,
                },
                ParamSpec {
                    name: "step7",
                    default: 0.0,
                },
            ],
            internal: false,
        });

        // Time
        self.register(NodeType {
            name: "delay",
            label: "Delay",
            description: "Ring-buffer delay line; the only legal way to close a feedback loop",
            category: NodeCategory::Time,
            inputs: &[PortSpec {
                name: "in",
                default: 0.0,
            }],
            outputs: &["out"],
            params: &[ParamSpec {
                name: "time",
                default: 0.25,
            }],
            internal: false,
        });

        // I/O
        self.register(NodeType {
            name: "scope",
            label: "Scope",
            description: "Waveform probe; streams its input to the editor",
            category: NodeCategory::Io,
            inputs: &[PortSpec {
                name: "in",
                default: 0.0,
            }],
            outputs: &[],
            params: &[],
            internal: false,
        });

        self.register(NodeType {
            name: "audio_out",
            label: "Audio Out",
            description: "Master stereo output",
            category: NodeCategory::Io,
            inputs: &[
                PortSpec {
                    name: "left",
                    default: 0.0,
                },
                PortSpec {
                    name: "right",
                    default: 0.0,
                },
            ],
            outputs: &[],
            params: &[ParamSpec {
                name: "gain",
                default: 1.0,
            }],
            internal: false,
        });

        // Compiler-internal halves of the delay split
        self.register(NodeType {
            name: "delay_write",
            label: "Delay Write",
            description: "Pushes a delay node's input into its ring buffer",
            category: NodeCategory::Time,
            inputs: &[PortSpec {
                name: "in",
                default: 0.0,
            }],
            outputs: &[],
            params: &[],
            internal: true,
        });

        self.register(NodeType {
            name: "delay_read",
            label: "Delay Read",
            description: "Reads a delay node's ring buffer behind the write position",
            category: NodeCategory::Time,
            inputs: &[],
            outputs: &["out"],
            params: &[],
            internal: true,
        });
    }

    /// Register a node type with the registry.
    fn register(&mut self, ty: NodeType) {
        self.entries.push(ty);
    }

    /// Returns all registered node types, internal ones included.
    pub fn all(&self) -> &[NodeType] {
        &self.entries
    }

    /// Returns the types in a specific category, internal ones excluded.
    pub fn in_category(&self, category: NodeCategory) -> Vec<&NodeType> {
        self.entries
            .iter()
            .filter(|t| t.category == category && !t.internal)
            .collect()
    }

    /// Get a type by name.
    pub fn get(&self, name: &str) -> Option<&NodeType> {
        self.entries.iter().find(|t| t.name == name)
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
