pub mod local_file;
