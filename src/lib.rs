pub mod api_connection;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod nutritional_matcher;
pub mod planning;
pub mod prompt;
pub mod recipe_aggregator;
pub mod recipe_parser;
pub mod shopping_list;
pub mod signature;
pub mod state;
pub mod store;
pub mod validator;
