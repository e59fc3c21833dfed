pub(crate) mod allocate;
