pub mod state_io;
