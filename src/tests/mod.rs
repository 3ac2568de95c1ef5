mod mock;
mod storage;
