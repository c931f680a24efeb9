pub mod helpers;

mod misuse;
