pub mod hyperpath;
