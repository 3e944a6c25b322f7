pub mod gate_cli;
