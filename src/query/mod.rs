pub mod builder;
pub mod cte;
