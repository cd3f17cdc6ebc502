mod common;
mod normalizer;
mod routing;
