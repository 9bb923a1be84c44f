pub mod bucketize;
