pub mod elastic_utils;
