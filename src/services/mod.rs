pub mod exec_service;
