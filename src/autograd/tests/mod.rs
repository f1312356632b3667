//! Property tests for autograd operations with gradient checking
