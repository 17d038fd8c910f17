/// Pass-selection/formatting knobs built directly from parsed CLI flags.
/// No config-file format: every knob here is something a subcommand's
/// flags set for a single invocation, not workspace state that persists
/// across runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// `lvn -c`/`lvn --cprop`: fold constants while value-numbering.
    pub cprop: bool,
    /// `tdce+` vs plain `tdce`: iterate global+local removal to a fixed
    /// point instead of a single global pass.
    pub extended_tdce: bool,
}
