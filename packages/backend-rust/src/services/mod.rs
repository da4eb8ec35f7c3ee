pub mod ebbinghaus;
