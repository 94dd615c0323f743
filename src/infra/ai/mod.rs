pub mod openai_service;
