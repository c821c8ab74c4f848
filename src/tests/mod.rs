mod test_cleanup_loop;
mod test_common_validation;
